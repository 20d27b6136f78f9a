use log::{debug, trace};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{Visit, walk};
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::{GetSpan, SourceType, Span};
use oxc_syntax::scope::ScopeFlags;
use std::{collections::HashMap, path::Path};

use crate::{
    analyzer::{Analysis, ModuleAnalyzer, js_string},
    error::AnalysisError,
};

const DEFAULT_BINDING: &str = "__default__";

/// Analyzer backed by `oxc_parser`.
///
/// ES module syntax is lowered to CommonJS-style statements by splicing the
/// original text around statement spans, so everything that is not
/// import/export syntax reaches the bundle untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct OxcAnalyzer;

impl ModuleAnalyzer for OxcAnalyzer {
    fn analyze(&self, path: &Path, source: &str) -> Result<Analysis, AnalysisError> {
        trace!("Parsing module: {}", path.display());
        let st = source_type_for(path);
        let allocator = Allocator::default();
        let ParserReturn { program, errors, panicked, .. } =
            OxcParser::new(&allocator, source, st).parse();

        if panicked || !errors.is_empty() {
            let message = errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "parser aborted".to_string());
            debug!("Parse failed for {}: {}", path.display(), message);
            return Err(AnalysisError::new(format!("{}: {}", path.display(), message)));
        }

        // module bodies are wrapped in a plain function, where await is a syntax error
        let mut awaits = TopLevelAwait::default();
        awaits.visit_program(&program);
        if let Some(span) = awaits.found {
            debug!("Top-level await in {} at offset {}", path.display(), span.start);
            return Err(AnalysisError::new(format!(
                "{}: top-level await cannot be bundled",
                path.display()
            )));
        }

        let mut lowering = Lowering::default();

        if let Some(hashbang) = &program.hashbang {
            lowering.remove(hashbang.span);
        }
        for stmt in &program.body {
            lowering.statement(stmt);
        }

        // imported names are read through the module record so they stay live
        if !lowering.imports.is_empty() {
            let edits = {
                let mut references = ImportReferences::new(&lowering.imports);
                references.visit_program(&program);
                references.edits
            };
            for (span, text) in edits {
                lowering.replace(span.start, span.end, text);
            }
        }

        // require() and import() can appear anywhere, not just at the top level
        let mut calls = RequireCollector::default();
        calls.visit_program(&program);
        for (span, request) in calls.dynamic {
            let text = format!(
                "Promise.resolve().then(function () {{ return require({}); }})",
                js_string(&request)
            );
            lowering.replace(span.start, span.end, text);
        }
        lowering.specifiers.extend(calls.requests);

        let prologue_at = program.directives.last().map(|d| d.span.end).unwrap_or(0);
        let analysis = lowering.finish(source, prologue_at);
        debug!("Found {} import specifiers in {}", analysis.specifiers.len(), path.display());
        Ok(analysis)
    }
}

fn source_type_for(path: &Path) -> SourceType {
    let ext = path.extension().and_then(|e| e.to_str());

    // .cjs files are CommonJS scripts; everything else uses the module goal
    if matches!(ext, Some("cjs")) {
        SourceType::cjs()
    } else {
        SourceType::mjs().with_jsx(true)
    }
}

struct Edit {
    start: u32,
    end: u32,
    text: String,
}

#[derive(Default)]
struct Lowering {
    edits: Vec<Edit>,
    /// (source offset, request) so the final order follows the text
    specifiers: Vec<(u32, String)>,
    /// (exported name, expression the getter returns)
    getters: Vec<(String, String)>,
    /// require() statements, in statement order
    requires: Vec<String>,
    /// imported local name -> expression that reads it from the module record
    imports: HashMap<String, String>,
    next_import: usize,
    is_esm: bool,
}

impl Lowering {
    fn replace(&mut self, start: u32, end: u32, text: impl Into<String>) {
        self.edits.push(Edit { start, end, text: text.into() });
    }

    fn remove(&mut self, span: Span) {
        self.replace(span.start, span.end, "");
    }

    fn getter(&mut self, exported: impl Into<String>, expr: impl Into<String>) {
        self.getters.push((exported.into(), expr.into()));
    }

    /// Emit `var __importN__ = require("...")` and return the binding name.
    fn bind_require(&mut self, source: &StringLiteral) -> String {
        let request = source.value.to_string();
        let binding = format!("__import{}__", self.next_import);
        self.next_import += 1;
        self.requires.push(format!("var {} = require({});", binding, js_string(&request)));
        self.specifiers.push((source.span.start, request));
        binding
    }

    fn statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::ImportDeclaration(decl) => {
                self.is_esm = true;
                self.remove(decl.span);
                self.import_declaration(decl);
            }
            Statement::ExportNamedDeclaration(decl) => {
                self.is_esm = true;
                self.export_named(decl);
            }
            Statement::ExportDefaultDeclaration(decl) => {
                self.is_esm = true;
                self.export_default(decl);
            }
            Statement::ExportAllDeclaration(decl) => {
                self.is_esm = true;
                self.remove(decl.span);
                if decl.export_kind.is_type() {
                    trace!("Dropping type-only re-export of '{}'", decl.source.value);
                    return;
                }
                let binding = self.bind_require(&decl.source);
                match &decl.exported {
                    Some(name) => self.getter(name.name().to_string(), binding),
                    None => self.requires.push(format!(
                        "Object.keys({b}).forEach(function (k) {{ if (k !== \"default\" && k !== \"__esModule\" && !Object.prototype.hasOwnProperty.call(exports, k)) Object.defineProperty(exports, k, {{ enumerable: true, get: function () {{ return {b}[k]; }} }}); }});",
                        b = binding
                    )),
                }
            }
            _ => {}
        }
    }

    fn import_declaration(&mut self, decl: &ImportDeclaration) {
        if decl.import_kind.is_type() {
            trace!("Dropping type-only import of '{}'", decl.source.value);
            return;
        }

        let Some(specifiers) = &decl.specifiers else {
            // import './side-effect'
            let request = decl.source.value.to_string();
            self.requires.push(format!("require({});", js_string(&request)));
            self.specifiers.push((decl.source.span.start, request));
            return;
        };

        let runtime: Vec<_> = specifiers
            .iter()
            .filter(|spec| {
                !matches!(spec, ImportDeclarationSpecifier::ImportSpecifier(s) if s.import_kind.is_type())
            })
            .collect();
        if runtime.is_empty() && !specifiers.is_empty() {
            trace!("Dropping import with only type specifiers from '{}'", decl.source.value);
            return;
        }

        let binding = self.bind_require(&decl.source);
        for spec in runtime {
            let (local, expr) = match spec {
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    (&s.local, member(&binding, s.imported.name().as_str()))
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    // CommonJS exports become the default export of a non-ES module
                    let holder = format!("{}_default__", binding.trim_end_matches('_'));
                    self.requires.push(format!(
                        "var {h} = {b} && {b}.__esModule ? {b} : {{ default: {b} }};",
                        h = holder,
                        b = binding
                    ));
                    (&s.local, format!("{}.default", holder))
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => (&s.local, binding.clone()),
            };
            self.imports.insert(local.name.to_string(), expr);
        }
    }

    fn export_named(&mut self, decl: &ExportNamedDeclaration) {
        if decl.export_kind.is_type() {
            self.remove(decl.span);
            return;
        }

        if let Some(source) = &decl.source {
            // export { a as b } from './x'
            self.remove(decl.span);
            let binding = self.bind_require(source);
            for spec in decl.specifiers.iter().filter(|s| !s.export_kind.is_type()) {
                let expr = member(&binding, spec.local.name().as_str());
                self.getter(spec.exported.name().to_string(), expr);
            }
            return;
        }

        if let Some(declaration) = &decl.declaration {
            if declaration.is_typescript_syntax() {
                self.remove(decl.span);
                return;
            }
            // keep the declaration, drop the `export` keyword
            self.replace(decl.span.start, declaration.span().start, "");
            for name in declared_names(declaration) {
                self.getter(name.clone(), name);
            }
            return;
        }

        // export { a, b as c }
        self.remove(decl.span);
        for spec in decl.specifiers.iter().filter(|s| !s.export_kind.is_type()) {
            self.getter(spec.exported.name().to_string(), spec.local.name().to_string());
        }
    }

    fn export_default(&mut self, decl: &ExportDefaultDeclaration) {
        match &decl.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(f) => match &f.id {
                Some(id) => {
                    self.replace(decl.span.start, f.span.start, "");
                    self.getter("default", id.name.to_string());
                }
                None => {
                    // name the function so it is still hoisted
                    let header = format!(
                        "{}function{} {}",
                        if f.r#async { "async " } else { "" },
                        if f.generator { "*" } else { "" },
                        DEFAULT_BINDING
                    );
                    self.replace(decl.span.start, f.params.span.start, header);
                    self.getter("default", DEFAULT_BINDING);
                }
            },
            ExportDefaultDeclarationKind::ClassDeclaration(c) if c.id.is_some() => {
                self.replace(decl.span.start, c.span.start, "");
                if let Some(id) = &c.id {
                    self.getter("default", id.name.to_string());
                }
            }
            ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => {
                self.remove(decl.span);
            }
            _ => {
                let inner = decl.declaration.span();
                self.replace(decl.span.start, inner.start, format!("var {} = ", DEFAULT_BINDING));
                self.replace(inner.end, inner.end, ";");
                self.getter("default", DEFAULT_BINDING);
            }
        }
    }

    fn finish(mut self, source: &str, prologue_at: u32) -> Analysis {
        let mut prologue = Vec::new();
        if self.is_esm {
            // module code is strict; inserted after any directives, so this is still a directive
            prologue.push(r#""use strict";"#.to_string());
            prologue.push(r#"Object.defineProperty(exports, "__esModule", { value: true });"#.to_string());
        }
        for (name, expr) in &self.getters {
            let expr = self.imports.get(expr).unwrap_or(expr);
            prologue.push(format!(
                "Object.defineProperty(exports, {}, {{ enumerable: true, get: function () {{ return {}; }} }});",
                js_string(name),
                expr
            ));
        }
        prologue.append(&mut self.requires);
        if !prologue.is_empty() {
            let mut text = prologue.join("\n");
            text.push('\n');
            if prologue_at > 0 {
                text.insert(0, '\n');
            }
            self.replace(prologue_at, prologue_at, text);
        }

        // Insertions sort ahead of replacements starting at the same offset
        self.edits.sort_by_key(|e| (e.start, e.end));
        let mut body = String::with_capacity(source.len());
        let mut cursor = 0usize;
        for edit in &self.edits {
            let start = edit.start as usize;
            if start < cursor {
                trace!("Skipping overlapping edit at offset {}", start);
                continue;
            }
            body.push_str(&source[cursor..start]);
            body.push_str(&edit.text);
            cursor = edit.end as usize;
        }
        body.push_str(&source[cursor..]);

        self.specifiers.sort_by_key(|(offset, _)| *offset);
        let mut specifiers: Vec<String> = Vec::with_capacity(self.specifiers.len());
        for (_, request) in self.specifiers {
            if !specifiers.contains(&request) {
                specifiers.push(request);
            }
        }

        Analysis { specifiers, body }
    }
}

/// Collects `require("...")` calls and `import("...")` expressions anywhere in a module.
#[derive(Default)]
struct RequireCollector {
    requests: Vec<(u32, String)>,
    dynamic: Vec<(Span, String)>,
}

impl<'a> Visit<'a> for RequireCollector {
    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &it.callee
            && callee.name.as_str() == "require"
            && it.arguments.len() == 1
            && let Some(Expression::StringLiteral(sl)) = it.arguments[0].as_expression()
        {
            trace!("Found require() call: '{}'", sl.value);
            self.requests.push((it.span.start, sl.value.to_string()));
        }
        walk::walk_call_expression(self, it);
    }

    fn visit_import_expression(&mut self, it: &ImportExpression<'a>) {
        if let Expression::StringLiteral(sl) = &it.source {
            trace!("Found dynamic import(): '{}'", sl.value);
            self.requests.push((it.span.start, sl.value.to_string()));
            self.dynamic.push((it.span, sl.value.to_string()));
        }
        walk::walk_import_expression(self, it);
    }
}

/// Finds the first `await` (or `for await`) outside of any function.
#[derive(Default)]
struct TopLevelAwait {
    depth: usize,
    found: Option<Span>,
}

impl TopLevelAwait {
    fn hit(&mut self, span: Span) {
        if self.depth == 0 && self.found.is_none() {
            self.found = Some(span);
        }
    }
}

impl<'a> Visit<'a> for TopLevelAwait {
    fn visit_function(&mut self, it: &Function<'a>, flags: ScopeFlags) {
        self.depth += 1;
        walk::walk_function(self, it, flags);
        self.depth -= 1;
    }

    fn visit_arrow_function_expression(&mut self, it: &ArrowFunctionExpression<'a>) {
        self.depth += 1;
        walk::walk_arrow_function_expression(self, it);
        self.depth -= 1;
    }

    fn visit_await_expression(&mut self, it: &AwaitExpression<'a>) {
        self.hit(it.span);
        walk::walk_await_expression(self, it);
    }

    fn visit_for_of_statement(&mut self, it: &ForOfStatement<'a>) {
        if it.r#await {
            self.hit(it.span);
        }
        walk::walk_for_of_statement(self, it);
    }

    fn visit_variable_declaration(&mut self, it: &VariableDeclaration<'a>) {
        if it.kind == VariableDeclarationKind::AwaitUsing {
            self.hit(it.span);
        }
        walk::walk_variable_declaration(self, it);
    }
}

/// Rewrites every reference to an imported name into a read of the module record.
///
/// Each scope on the stack holds the imported names it shadows; references
/// under a shadowing declaration are left alone.
struct ImportReferences<'i> {
    imports: &'i HashMap<String, String>,
    scopes: Vec<Vec<String>>,
    callee: Option<Span>,
    edits: Vec<(Span, String)>,
}

impl<'i> ImportReferences<'i> {
    fn new(imports: &'i HashMap<String, String>) -> Self {
        Self { imports, scopes: Vec::new(), callee: None, edits: Vec::new() }
    }

    fn lookup(&self, name: &str) -> Option<&'i String> {
        if self.scopes.iter().flatten().any(|shadow| shadow == name) {
            return None;
        }
        self.imports.get(name)
    }

    fn push_scope(&mut self, names: Vec<String>) {
        let shadows = names.into_iter().filter(|n| self.imports.contains_key(n)).collect();
        self.scopes.push(shadows);
    }

    fn function_scope(&mut self, params: &FormalParameters, body: Option<&FunctionBody>) {
        let mut names = param_names(params);
        if let Some(body) = body {
            names.extend(var_names(&body.statements));
            names.extend(lexical_names(&body.statements));
        }
        self.push_scope(names);
    }
}

impl<'a> Visit<'a> for ImportReferences<'_> {
    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        let Some(expr) = self.lookup(it.name.as_str()) else {
            return;
        };
        // a bare member call would bind `this` to the module record
        let text = if self.callee == Some(it.span) && expr.contains(['.', '[']) {
            format!("(0, {})", expr)
        } else {
            expr.clone()
        };
        self.edits.push((it.span, text));
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &it.callee {
            self.callee = Some(callee.span);
        }
        walk::walk_call_expression(self, it);
    }

    fn visit_object_property(&mut self, it: &ObjectProperty<'a>) {
        if it.shorthand
            && let Expression::Identifier(ident) = &it.value
            && let Some(expr) = self.lookup(ident.name.as_str())
        {
            self.edits.push((it.span, format!("{}: {}", ident.name, expr)));
            return;
        }
        walk::walk_object_property(self, it);
    }

    fn visit_function(&mut self, it: &Function<'a>, flags: ScopeFlags) {
        self.function_scope(&it.params, it.body.as_deref());
        if let Some(id) = &it.id
            && let Some(scope) = self.scopes.last_mut()
            && self.imports.contains_key(id.name.as_str())
        {
            scope.push(id.name.to_string());
        }
        walk::walk_function(self, it, flags);
        self.scopes.pop();
    }

    fn visit_arrow_function_expression(&mut self, it: &ArrowFunctionExpression<'a>) {
        self.function_scope(&it.params, Some(&*it.body));
        walk::walk_arrow_function_expression(self, it);
        self.scopes.pop();
    }

    fn visit_class(&mut self, it: &Class<'a>) {
        self.push_scope(it.id.iter().map(|id| id.name.to_string()).collect());
        walk::walk_class(self, it);
        self.scopes.pop();
    }

    fn visit_static_block(&mut self, it: &StaticBlock<'a>) {
        let mut names = var_names(&it.body);
        names.extend(lexical_names(&it.body));
        self.push_scope(names);
        walk::walk_static_block(self, it);
        self.scopes.pop();
    }

    fn visit_block_statement(&mut self, it: &BlockStatement<'a>) {
        self.push_scope(lexical_names(&it.body));
        walk::walk_block_statement(self, it);
        self.scopes.pop();
    }

    fn visit_switch_statement(&mut self, it: &SwitchStatement<'a>) {
        let names = it.cases.iter().flat_map(|case| lexical_names(&case.consequent)).collect();
        self.push_scope(names);
        walk::walk_switch_statement(self, it);
        self.scopes.pop();
    }

    fn visit_catch_clause(&mut self, it: &CatchClause<'a>) {
        let mut names = Vec::new();
        if let Some(param) = &it.param {
            binding_names(&param.pattern, &mut names);
        }
        self.push_scope(names);
        walk::walk_catch_clause(self, it);
        self.scopes.pop();
    }

    fn visit_for_statement(&mut self, it: &ForStatement<'a>) {
        let mut names = Vec::new();
        if let Some(ForStatementInit::VariableDeclaration(vd)) = &it.init {
            variable_names(vd, &mut names);
        }
        self.push_scope(names);
        walk::walk_for_statement(self, it);
        self.scopes.pop();
    }

    fn visit_for_in_statement(&mut self, it: &ForInStatement<'a>) {
        self.push_scope(left_names(&it.left));
        walk::walk_for_in_statement(self, it);
        self.scopes.pop();
    }

    fn visit_for_of_statement(&mut self, it: &ForOfStatement<'a>) {
        self.push_scope(left_names(&it.left));
        walk::walk_for_of_statement(self, it);
        self.scopes.pop();
    }
}

/// `var` names hoisted to the enclosing function, without entering nested functions.
#[derive(Default)]
struct VarNames(Vec<String>);

impl<'a> Visit<'a> for VarNames {
    fn visit_variable_declaration(&mut self, it: &VariableDeclaration<'a>) {
        if it.kind == VariableDeclarationKind::Var {
            variable_names(it, &mut self.0);
        }
        walk::walk_variable_declaration(self, it);
    }

    fn visit_function(&mut self, _it: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _it: &ArrowFunctionExpression<'a>) {}

    fn visit_class(&mut self, _it: &Class<'a>) {}
}

fn var_names(statements: &[Statement]) -> Vec<String> {
    let mut collector = VarNames::default();
    for stmt in statements {
        collector.visit_statement(stmt);
    }
    collector.0
}

/// Names declared with `let`, `const`, `class` or `function` directly in `statements`.
fn lexical_names(statements: &[Statement]) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in statements {
        match stmt {
            Statement::VariableDeclaration(vd) if vd.kind != VariableDeclarationKind::Var => {
                variable_names(vd, &mut names);
            }
            Statement::FunctionDeclaration(f) => names.extend(f.id.iter().map(|id| id.name.to_string())),
            Statement::ClassDeclaration(c) => names.extend(c.id.iter().map(|id| id.name.to_string())),
            _ => {}
        }
    }
    names
}

fn param_names(params: &FormalParameters) -> Vec<String> {
    let mut names = Vec::new();
    for param in &params.items {
        binding_names(&param.pattern, &mut names);
    }
    if let Some(rest) = &params.rest {
        binding_names(&rest.argument, &mut names);
    }
    names
}

fn left_names(left: &ForStatementLeft) -> Vec<String> {
    let mut names = Vec::new();
    if let ForStatementLeft::VariableDeclaration(vd) = left {
        variable_names(vd, &mut names);
    }
    names
}

fn variable_names(decl: &VariableDeclaration, names: &mut Vec<String>) {
    for declarator in &decl.declarations {
        binding_names(&declarator.id, names);
    }
}

fn declared_names(decl: &Declaration) -> Vec<String> {
    let mut names = Vec::new();
    match decl {
        Declaration::VariableDeclaration(vd) => variable_names(vd, &mut names),
        Declaration::FunctionDeclaration(f) => {
            names.extend(f.id.iter().map(|id| id.name.to_string()));
        }
        Declaration::ClassDeclaration(c) => {
            names.extend(c.id.iter().map(|id| id.name.to_string()));
        }
        _ => {}
    }
    names
}

fn binding_names(pattern: &BindingPattern, names: &mut Vec<String>) {
    match &pattern.kind {
        BindingPatternKind::BindingIdentifier(ident) => names.push(ident.name.to_string()),
        BindingPatternKind::ObjectPattern(obj) => {
            for prop in &obj.properties {
                binding_names(&prop.value, names);
            }
            if let Some(rest) = &obj.rest {
                binding_names(&rest.argument, names);
            }
        }
        BindingPatternKind::ArrayPattern(arr) => {
            for elem in arr.elements.iter().flatten() {
                binding_names(elem, names);
            }
            if let Some(rest) = &arr.rest {
                binding_names(&rest.argument, names);
            }
        }
        BindingPatternKind::AssignmentPattern(assign) => binding_names(&assign.left, names),
    }
}

fn member(object: &str, name: &str) -> String {
    if is_identifier_name(name) {
        format!("{}.{}", object, name)
    } else {
        format!("{}[{}]", object, js_string(name))
    }
}

fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
