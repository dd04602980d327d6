//! The compile driver: scan, parse, resolve and lower a set of source
//! files against one Context. Exit is clean iff no error was reported.

use anyhow::{anyhow, bail, Context as _, Result};
use netuno_codegen::lower_module;
use netuno_common::Report;
use netuno_nir::{Context, Module};
use netuno_parser::{parse_module, Node};
use netuno_typechecker::builtins::build_global_scope;
use netuno_typechecker::{resolve, Symbol, SymbolKind, TypeMap, TypeRegistry};
use std::path::{Path, PathBuf};

pub fn build_files(paths: &[PathBuf], print_ir: bool, dump_ast: bool) -> Result<()> {
    let mut files = Vec::new();
    for path in paths {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read '{}'", path.display()))?;
        files.push((module_name(path)?, source));
    }

    let output = compile(&files, dump_ast)?;

    eprint!("{}", output.report);
    if output.report.had_error() {
        bail!("compilation failed");
    }

    if print_ir {
        for module in &output.modules {
            print!("{}", output.context.display_module(module));
        }
    }

    log::info!("compiled {} module(s)", output.modules.len());
    Ok(())
}

fn module_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("'{}' has no usable module name", path.display()))
}

pub struct CompileOutput {
    pub context: Context,
    pub modules: Vec<Module>,
    pub report: Report,
}

/// Compile `(module name, source)` records into IR modules.
pub fn compile(files: &[(String, String)], dump_ast: bool) -> Result<CompileOutput> {
    let mut context = Context::new();
    let registry = TypeRegistry::new(&mut context);

    let mut asts: Vec<Node> = Vec::new();
    for (name, source) in files {
        let ast = parse_module(source, name)?;
        if dump_ast {
            println!("{}", serde_json::to_string_pretty(&ast)?);
        }
        asts.push(ast);
    }

    // the global table: console plus one module symbol per file
    let mut global = build_global_scope(&registry);
    for (name, _) in files {
        let module_type = registry.take_module_type(name);
        global.insert(Symbol::new(
            name.as_str(),
            SymbolKind::MODULE | SymbolKind::PUBLIC,
            module_type,
        ));
    }

    let mut types = TypeMap::new();
    let mut report = Report::new();
    let resolved = resolve(&registry, &mut types, &mut report, global.clone(), &asts);

    let mut modules = Vec::new();
    if resolved {
        for ast in &asts {
            let lowered = lower_module(
                &mut context,
                &registry,
                &mut types,
                &mut report,
                global.clone(),
                ast,
            );
            if let Some(module) = lowered {
                modules.push(module);
            }
        }
    }

    Ok(CompileOutput {
        context,
        modules,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_compile_single_module() {
        let files = vec![(
            "demo".to_string(),
            "def answer(): i32 => 42".to_string(),
        )];
        let output = compile(&files, false).expect("compile");
        assert!(!output.report.had_error());
        assert_eq!(output.modules.len(), 1);
        assert!(output.modules[0]
            .get_function(&output.context, "answer")
            .is_some());
    }

    #[test]
    fn test_compile_reports_errors() {
        let files = vec![("demo".to_string(), "def f(): i32 => missing".to_string())];
        let output = compile(&files, false).expect("compile runs");
        assert!(output.report.had_error());
        assert!(output.modules.is_empty());
    }

    #[test]
    fn test_cross_module_call() {
        let files = vec![
            (
                "lib".to_string(),
                "public def double(x: i32): i32 => x * 2".to_string(),
            ),
            (
                "app".to_string(),
                "import lib def main(): i32 => lib.double(21)".to_string(),
            ),
        ];
        let output = compile(&files, false).expect("compile");
        assert!(!output.report.had_error(), "report: {}", output.report);
        assert_eq!(output.modules.len(), 2);
    }

    #[test]
    fn test_build_files_with_tempfiles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hello.nt");
        let mut file = std::fs::File::create(&path).expect("create");
        write!(file, "sub main() console.write(\"hello\") end").expect("write");

        build_files(&[path], false, false).expect("build succeeds");
    }

    #[test]
    fn test_build_files_fails_on_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.nt");
        let mut file = std::fs::File::create(&path).expect("create");
        write!(file, "def f(): i32 => missing").expect("write");

        assert!(build_files(&[path], false, false).is_err());
    }
}
