//! AST-level check that every spawned loop can be cancelled.
//!
//! Pollers and timers run as spawned tasks. A `loop` inside `tokio::spawn`
//! (or a `.spawn(` method call) must contain a `select!` so a shutdown token
//! can end it; otherwise Ctrl+C hangs waiting for the task.
//!
//! ```ignore
//! tokio::spawn(async move {
//!     loop {
//!         tokio::select! {
//!             _ = shutdown.cancelled() => break,
//!             _ = ticker.tick() => { /* work */ }
//!         }
//!     }
//! });
//! ```

use std::fs;
use std::path::Path;
use syn::visit::Visit;
use syn::{Expr, ExprCall, ExprLoop, ExprMacro, ExprMethodCall, ExprWhile, Macro, StmtMacro};
use walkdir::WalkDir;

#[derive(Default)]
struct SpawnLoopVisitor {
    /// Nesting of spawn calls around the current node
    spawn_depth: usize,
    /// Nesting of loops inside a spawn
    loop_depth: usize,
    select_seen: bool,
    violations: Vec<String>,
}

fn is_spawn_call(call: &ExprCall) -> bool {
    let Expr::Path(path) = &*call.func else {
        return false;
    };
    let segments: Vec<_> = path
        .path
        .segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect();
    segments == ["tokio", "spawn"] || segments == ["tokio", "task", "spawn"]
}

fn is_select(mac: &Macro) -> bool {
    mac.path
        .segments
        .last()
        .is_some_and(|s| s.ident == "select")
}

impl SpawnLoopVisitor {
    fn enter_spawn<'a>(&mut self, args: impl Iterator<Item = &'a Expr>) {
        self.spawn_depth += 1;
        for arg in args {
            self.visit_expr(arg);
        }
        self.spawn_depth -= 1;
    }

    /// Visit a loop body and record it if no `select!` was found inside.
    fn check_loop(&mut self, kind: &str, visit: impl FnOnce(&mut Self)) {
        self.loop_depth += 1;
        let outer = std::mem::replace(&mut self.select_seen, false);

        visit(self);

        if !self.select_seen {
            self.violations
                .push(format!("spawned {} without cancellation", kind));
        }
        self.select_seen = outer;
        self.loop_depth -= 1;
    }
}

impl<'ast> Visit<'ast> for SpawnLoopVisitor {
    fn visit_expr_call(&mut self, call: &'ast ExprCall) {
        if is_spawn_call(call) {
            self.enter_spawn(call.args.iter());
        } else {
            syn::visit::visit_expr_call(self, call);
        }
    }

    fn visit_expr_method_call(&mut self, call: &'ast ExprMethodCall) {
        // JoinSet::spawn and friends have the same requirement
        if call.method == "spawn" {
            self.enter_spawn(call.args.iter());
        } else {
            syn::visit::visit_expr_method_call(self, call);
        }
    }

    fn visit_expr_loop(&mut self, expr: &'ast ExprLoop) {
        if self.spawn_depth > 0 {
            self.check_loop("loop", |v| syn::visit::visit_expr_loop(v, expr));
        } else {
            syn::visit::visit_expr_loop(self, expr);
        }
    }

    fn visit_expr_while(&mut self, expr: &'ast ExprWhile) {
        if self.spawn_depth > 0 {
            self.check_loop("while loop", |v| syn::visit::visit_expr_while(v, expr));
        } else {
            syn::visit::visit_expr_while(self, expr);
        }
    }

    fn visit_expr_macro(&mut self, mac: &'ast ExprMacro) {
        if self.loop_depth > 0 && is_select(&mac.mac) {
            self.select_seen = true;
        }
        syn::visit::visit_expr_macro(self, mac);
    }

    fn visit_stmt_macro(&mut self, mac: &'ast StmtMacro) {
        if self.loop_depth > 0 && is_select(&mac.mac) {
            self.select_seen = true;
        }
        syn::visit::visit_stmt_macro(self, mac);
    }
}

fn analyze_source(source: &str) -> Vec<String> {
    let syntax = match syn::parse_file(source) {
        Ok(s) => s,
        Err(e) => return vec![format!("unparseable source: {}", e)],
    };
    let mut visitor = SpawnLoopVisitor::default();
    visitor.visit_file(&syntax);
    visitor.violations
}

fn analyze_file(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(content) => analyze_source(&content)
            .into_iter()
            .map(|v| format!("{}: {}", path.display(), v))
            .collect(),
        Err(_) => vec![],
    }
}

#[test]
fn spawned_loops_must_have_cancellation() {
    let src_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");

    let violations: Vec<String> = WalkDir::new(&src_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .flat_map(|e| analyze_file(e.path()))
        .collect();

    if !violations.is_empty() {
        let mut msg = String::from(
            "\n\nFound spawned loops without cancellation handling!\n\
             These will prevent graceful shutdown (Ctrl+C will hang).\n\n\
             Fix by selecting on the poller's or guard's CancellationToken.\n\n\
             Violations:\n",
        );
        for violation in &violations {
            msg.push_str(&format!("  - {}\n", violation));
        }
        panic!("{}", msg);
    }
}

#[test]
fn lint_flags_bare_loop() {
    let source = r#"
        fn start() {
            tokio::spawn(async move {
                loop {
                    ticker.tick().await;
                    poll().await;
                }
            });
        }
    "#;
    assert_eq!(analyze_source(source).len(), 1);
}

#[test]
fn lint_accepts_select_loop_and_one_shot_task() {
    let source = r#"
        fn start(shutdown: CancellationToken) {
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = ticker.tick() => poll().await,
                    }
                }
            });
            tokio::spawn(async move {
                fetch().await;
            });
        }
    "#;
    assert!(analyze_source(source).is_empty());
}
