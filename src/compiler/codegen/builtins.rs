use super::*;

/// Shared `"%s\n"` format string for non-literal prints.
const FMT_GLOBAL: &str = "fmt_str";
/// Shared `"\n"` string for `print()`.
const NEWLINE_GLOBAL: &str = "newline_str";

const UNHANDLED_CALLEE: &str =
    "; Call to unhandled complex callable (e.g., attribute access, subscript)";

impl Emitter {
    pub(crate) fn emit_call(&mut self, call: &Call) -> Operand {
        match call.func.as_name() {
            Some("print") => self.emit_print(call),
            Some(name) => {
                debug!(callee = %name, "no lowering for call, emitting placeholder");
                self.emit_line(&format!("; Placeholder for call to function @{}", name));
                Operand::Placeholder(format!(
                    "%call_result_placeholder_for_{0} ; Placeholder return value for {0}",
                    name
                ))
            }
            None => {
                debug!(callee = call.func.kind.label(), "unhandled callee");
                self.emit_line(UNHANDLED_CALLEE);
                Operand::Unhandled(UNHANDLED_CALLEE.to_string())
            }
        }
    }

    /// Lower `print(...)` to a `printf` call. Keyword arguments are ignored.
    fn emit_print(&mut self, call: &Call) -> Operand {
        let printf_args = match &call.args[..] {
            [] => self.intern_named(NEWLINE_GLOBAL, "\n").to_string(),
            [Expr {
                kind: ExprKind::Constant(Constant::Str(literal)),
                ..
            }] => {
                // Print the literal and its newline as a single constant.
                let text = format!("{}\n", literal);
                self.emit_constant(&Constant::Str(text)).to_string()
            }
            [first, rest @ ..] => {
                let fmt = self.intern_named(FMT_GLOBAL, "%s\n");
                let value = self.emit_expr(first);
                if !rest.is_empty() {
                    debug!(dropped = rest.len(), "print lowers only its first argument");
                }
                format!("{}, {}", fmt, value)
            }
        };

        let instr = format!("call i32 @printf({})", printf_args);
        self.emit_line(&instr);
        Operand::Placeholder(instr)
    }
}
