use super::*;
use tracing::warn;

impl Emitter {
    pub(crate) fn emit_return(&mut self, ret: &ReturnStmt) {
        let ctx = self.current_fn.as_ref();
        let is_main = ctx.map_or(false, FunctionCtx::is_main);
        let ret_ty = ctx.map_or(IrType::Void, |c| c.ret_ty);

        let Some(value) = &ret.value else {
            let instr = if is_main {
                "ret i32 0".to_string()
            } else {
                match ret_ty.zero_value() {
                    Some(zero) if self.options.typed_returns => format!("ret {} {}", ret_ty, zero),
                    _ => "ret void".to_string(),
                }
            };
            self.emit_line(&instr);
            return;
        };

        let operand = self.emit_expr(value);
        let instr = if is_main {
            format!("ret i32 {}", operand)
        } else if self.options.typed_returns {
            if ret_ty.is_void() {
                "ret void".to_string()
            } else {
                format!("ret {} {}", ret_ty, operand.untyped())
            }
        } else {
            if !ret_ty.is_void() {
                warn!(
                    function = self.current_fn.as_ref().map_or("<module>", |c| c.name.as_str()),
                    %ret_ty,
                    "value return lowered as `ret void`; enable typed returns for a typed `ret`"
                );
            }
            format!(
                "ret void ; Placeholder for non-main return, value: {}",
                operand
            )
        };
        self.emit_line(&instr);
    }
}
