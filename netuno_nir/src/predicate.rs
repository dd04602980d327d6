//! Comparison predicates and their algebra.
//!
//! Floating predicates occupy the low discriminants, integer predicates the
//! high ones; the int/float classification tests are closed range checks
//! over that layout.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Predicate {
    /// float: true if equal
    FEq = 0,
    /// float: true if greater than
    FGt,
    /// float: true if greater than or equal
    FGe,
    /// float: true if less than
    FLt,
    /// float: true if less than or equal
    FLe,
    /// float: true if unequal
    FNe,
    /// float: true if ordered (no nan)
    FOrd,
    /// float: true if unordered (either operand nan)
    FUno,

    /// int: true if equal
    Eq,
    /// int: true if unequal
    Ne,
    /// int: true if unsigned greater than
    Ugt,
    /// int: true if unsigned greater than or equal
    Uge,
    /// int: true if unsigned less than
    Ult,
    /// int: true if unsigned less than or equal
    Ule,
    /// int: true if signed greater than
    Sgt,
    /// int: true if signed greater than or equal
    Sge,
    /// int: true if signed less than
    Slt,
    /// int: true if signed less than or equal
    Sle,
}

const FCMP_FIRST: u8 = Predicate::FEq as u8;
const FCMP_LAST: u8 = Predicate::FUno as u8;
const ICMP_FIRST: u8 = Predicate::Eq as u8;
const ICMP_LAST: u8 = Predicate::Sle as u8;

impl Predicate {
    pub const ALL: [Predicate; 18] = [
        Predicate::FEq,
        Predicate::FGt,
        Predicate::FGe,
        Predicate::FLt,
        Predicate::FLe,
        Predicate::FNe,
        Predicate::FOrd,
        Predicate::FUno,
        Predicate::Eq,
        Predicate::Ne,
        Predicate::Ugt,
        Predicate::Uge,
        Predicate::Ult,
        Predicate::Ule,
        Predicate::Sgt,
        Predicate::Sge,
        Predicate::Slt,
        Predicate::Sle,
    ];

    /// The predicate that is true exactly when `self` is false.
    pub fn inverse(self) -> Predicate {
        match self {
            Predicate::FEq => Predicate::FNe,
            Predicate::FGt => Predicate::FLe,
            Predicate::FGe => Predicate::FLt,
            Predicate::FLt => Predicate::FGe,
            Predicate::FLe => Predicate::FGt,
            Predicate::FNe => Predicate::FEq,
            Predicate::FOrd => Predicate::FUno,
            Predicate::FUno => Predicate::FOrd,

            Predicate::Eq => Predicate::Ne,
            Predicate::Ne => Predicate::Eq,
            Predicate::Ugt => Predicate::Ule,
            Predicate::Uge => Predicate::Ult,
            Predicate::Ult => Predicate::Uge,
            Predicate::Ule => Predicate::Ugt,
            Predicate::Sgt => Predicate::Sle,
            Predicate::Sge => Predicate::Slt,
            Predicate::Slt => Predicate::Sge,
            Predicate::Sle => Predicate::Sgt,
        }
    }

    /// `>=`/`<=` become `>`/`<`; anything else is returned unchanged.
    pub fn strict(self) -> Predicate {
        match self {
            Predicate::FGe => Predicate::FGt,
            Predicate::FLe => Predicate::FLt,
            Predicate::Uge => Predicate::Ugt,
            Predicate::Ule => Predicate::Ult,
            Predicate::Sge => Predicate::Sgt,
            Predicate::Sle => Predicate::Slt,
            other => other,
        }
    }

    /// `>`/`<` become `>=`/`<=`; anything else is returned unchanged.
    pub fn non_strict(self) -> Predicate {
        match self {
            Predicate::FGt => Predicate::FGe,
            Predicate::FLt => Predicate::FLe,
            Predicate::Ugt => Predicate::Uge,
            Predicate::Ult => Predicate::Ule,
            Predicate::Sgt => Predicate::Sge,
            Predicate::Slt => Predicate::Sle,
            other => other,
        }
    }

    /// Signed version of an unsigned predicate. Calling this with anything
    /// but an unsigned predicate is a programming error.
    pub fn signed(self) -> Predicate {
        assert!(self.is_unsigned(), "only call with unsigned predicates!");
        match self {
            Predicate::Ult => Predicate::Slt,
            Predicate::Ule => Predicate::Sle,
            Predicate::Ugt => Predicate::Sgt,
            Predicate::Uge => Predicate::Sge,
            _ => unreachable!(),
        }
    }

    /// Unsigned version of a signed predicate. Calling this with anything
    /// but a signed predicate is a programming error.
    pub fn unsigned(self) -> Predicate {
        assert!(self.is_signed(), "only call with signed predicates!");
        match self {
            Predicate::Slt => Predicate::Ult,
            Predicate::Sle => Predicate::Ule,
            Predicate::Sgt => Predicate::Ugt,
            Predicate::Sge => Predicate::Uge,
            _ => unreachable!(),
        }
    }

    pub fn is_int_predicate(self) -> bool {
        (self as u8) >= ICMP_FIRST && (self as u8) <= ICMP_LAST
    }

    pub fn is_fp_predicate(self) -> bool {
        (self as u8) >= FCMP_FIRST && (self as u8) <= FCMP_LAST
    }

    /// False when the operands are equal.
    pub fn is_strict(self) -> bool {
        matches!(
            self,
            Predicate::FGt
                | Predicate::FLt
                | Predicate::Ugt
                | Predicate::Ult
                | Predicate::Sgt
                | Predicate::Slt
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(
            self,
            Predicate::Eq | Predicate::Ne | Predicate::FEq | Predicate::FNe
        )
    }

    pub fn is_relational(self) -> bool {
        !self.is_equality()
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Predicate::Sgt | Predicate::Sge | Predicate::Slt | Predicate::Sle
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Predicate::Ugt | Predicate::Uge | Predicate::Ult | Predicate::Ule
        )
    }

    /// True when comparing a value with itself.
    pub fn is_true_when_equal(self) -> bool {
        matches!(
            self,
            Predicate::FEq
                | Predicate::FGe
                | Predicate::FLe
                | Predicate::Eq
                | Predicate::Uge
                | Predicate::Ule
                | Predicate::Sge
                | Predicate::Sle
        )
    }

    /// False when comparing a value with itself.
    pub fn is_false_when_equal(self) -> bool {
        matches!(
            self,
            Predicate::FNe
                | Predicate::FGt
                | Predicate::FLt
                | Predicate::Ne
                | Predicate::Ugt
                | Predicate::Ult
                | Predicate::Sgt
                | Predicate::Slt
        )
    }

    /// Whether `A self B` being true implies `A other B` is true.
    pub fn implies_true(self, other: Predicate) -> bool {
        if self == other {
            return true;
        }

        match self {
            // A == B implies any non-strict (>=u, <=u, >=s, <=s) is true.
            Predicate::Eq => matches!(
                other,
                Predicate::Uge | Predicate::Ule | Predicate::Sge | Predicate::Sle
            ),
            // A >u B implies A != B and A >=u B are true.
            Predicate::Ugt => matches!(other, Predicate::Ne | Predicate::Uge),
            // A <u B implies A != B and A <=u B are true.
            Predicate::Ult => matches!(other, Predicate::Ne | Predicate::Ule),
            // A >s B implies A != B and A >=s B are true.
            Predicate::Sgt => matches!(other, Predicate::Ne | Predicate::Sge),
            // A <s B implies A != B and A <=s B are true.
            Predicate::Slt => matches!(other, Predicate::Ne | Predicate::Sle),
            _ => false,
        }
    }

    /// Whether `A self B` being true implies `A other B` is false.
    pub fn implies_false(self, other: Predicate) -> bool {
        self.implies_true(other.inverse())
    }

    pub fn name(self) -> &'static str {
        match self {
            Predicate::FEq => "eq",
            Predicate::FGt => "gt",
            Predicate::FGe => "ge",
            Predicate::FLt => "lt",
            Predicate::FLe => "le",
            Predicate::FNe => "ne",
            Predicate::FOrd => "or",
            Predicate::FUno => "uo",
            Predicate::Eq => "eq",
            Predicate::Ne => "ne",
            Predicate::Ugt => "ugt",
            Predicate::Uge => "uge",
            Predicate::Ult => "ult",
            Predicate::Ule => "ule",
            Predicate::Sgt => "sgt",
            Predicate::Sge => "sge",
            Predicate::Slt => "slt",
            Predicate::Sle => "sle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_predicate() -> impl Strategy<Value = Predicate> {
        prop::sample::select(Predicate::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_inverse_is_an_involution(p in any_predicate()) {
            prop_assert_eq!(p.inverse().inverse(), p);
        }

        #[test]
        fn prop_inverse_stays_in_family(p in any_predicate()) {
            prop_assert_eq!(p.is_int_predicate(), p.inverse().is_int_predicate());
            prop_assert_eq!(p.is_fp_predicate(), p.inverse().is_fp_predicate());
        }

        #[test]
        fn prop_strict_of_non_strict_round_trips(p in any_predicate()) {
            if p.is_strict() {
                prop_assert_eq!(p.non_strict().strict(), p);
            }
        }

        #[test]
        fn prop_sign_flips_round_trip(p in any_predicate()) {
            if p.is_signed() {
                prop_assert_eq!(p.unsigned().signed(), p);
            }
            if p.is_unsigned() {
                prop_assert_eq!(p.signed().unsigned(), p);
            }
        }

        #[test]
        fn prop_exactly_one_family(p in any_predicate()) {
            prop_assert!(p.is_int_predicate() ^ p.is_fp_predicate());
        }

        #[test]
        fn prop_implies_false_matches_inverse(
            p in any_predicate(),
            q in any_predicate(),
        ) {
            prop_assert_eq!(p.implies_false(q), p.implies_true(q.inverse()));
        }

        #[test]
        fn prop_equal_self_classification_is_exclusive(p in any_predicate()) {
            // ordering-only float predicates (or/uo) are neither
            prop_assert!(!(p.is_true_when_equal() && p.is_false_when_equal()));
        }
    }

    #[test]
    fn test_inverse_table_spot_checks() {
        assert_eq!(Predicate::Eq.inverse(), Predicate::Ne);
        assert_eq!(Predicate::Sgt.inverse(), Predicate::Sle);
        assert_eq!(Predicate::Ult.inverse(), Predicate::Uge);
        assert_eq!(Predicate::FOrd.inverse(), Predicate::FUno);
    }

    #[test]
    fn test_implies_true_table() {
        assert!(Predicate::Eq.implies_true(Predicate::Uge));
        assert!(Predicate::Eq.implies_true(Predicate::Sle));
        assert!(!Predicate::Eq.implies_true(Predicate::Ugt));
        assert!(Predicate::Ugt.implies_true(Predicate::Ne));
        assert!(Predicate::Ugt.implies_true(Predicate::Uge));
        assert!(!Predicate::Ugt.implies_true(Predicate::Sge));
        assert!(Predicate::Slt.implies_true(Predicate::Sle));
    }

    #[test]
    fn test_implies_false_via_inverse() {
        // A == B implies A < B is false (inverse of < is >=, and == implies >=)
        assert!(Predicate::Eq.implies_false(Predicate::Ult));
        assert!(Predicate::Ugt.implies_false(Predicate::Eq));
    }
}
