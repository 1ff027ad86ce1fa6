//! Per-function scratch state.
//!
//! Reset on entry to each function's lowering and discarded on exit: the
//! `while`-loop label table, the temporary write/read cursors, and the
//! flags the rest of lowering reads repeatedly rather than re-deriving from
//! the AST each time.

use std::collections::HashMap;

use crate::ast::LoopId;
use crate::error::BackendError;

/// Scratch state for one function, live only while that function's body is
/// being lowered.
pub struct FuncScratch {
    /// Dense label ids for `while` nodes, allocated on first sight.
    jump_targets: HashMap<LoopId, u32>,
    next_jump_target: u32,
    max_jump_targets: usize,
    /// Number of hoisted suspendible-call temporaries emitted so far.
    temp_w: usize,
    /// Number of hoisted temporaries consumed by the surrounding
    /// expression so far. Must equal `temp_w` at function end.
    temp_r: usize,
    max_temp: usize,
    pub is_public: bool,
    pub is_suspendible: bool,
    /// The receiver struct's bare source name, e.g. `bar`, if this function
    /// has a receiver.
    pub receiver_name: Option<String>,
}

impl FuncScratch {
    pub fn new(
        is_public: bool,
        is_suspendible: bool,
        receiver_name: Option<String>,
        max_jump_targets: usize,
        max_temp: usize,
    ) -> Self {
        FuncScratch {
            jump_targets: HashMap::new(),
            next_jump_target: 0,
            max_jump_targets,
            temp_w: 0,
            temp_r: 0,
            max_temp,
            is_public,
            is_suspendible,
            receiver_name,
        }
    }

    pub fn has_receiver(&self) -> bool {
        self.receiver_name.is_some()
    }

    /// The statement a hoisted suspendible call emits on failure: jump to
    /// the shared cleanup label in a public function, or return directly
    /// from a private one.
    pub fn exit_stmt(&self) -> &'static str {
        if self.is_public {
            "goto cleanup0;"
        } else {
            "return status;"
        }
    }

    /// Resolve a `while` node to its dense label id, allocating one on
    /// first sight.
    pub fn jump_target(&mut self, loop_id: LoopId) -> Result<u32, BackendError> {
        if let Some(&id) = self.jump_targets.get(&loop_id) {
            return Ok(id);
        }
        if self.jump_targets.len() >= self.max_jump_targets {
            return Err(BackendError::TooManyJumpTargets(format!(
                "function uses more than {} distinct while-loop jump targets",
                self.max_jump_targets
            )));
        }
        let id = self.next_jump_target;
        self.next_jump_target += 1;
        self.jump_targets.insert(loop_id, id);
        Ok(id)
    }

    /// Allocate the next hoisted-temporary id, e.g. `t_7`.
    pub fn alloc_temp(&mut self) -> Result<usize, BackendError> {
        if self.temp_w >= self.max_temp {
            return Err(BackendError::TooManyTemporaries(format!(
                "function hoists more than {} suspendible-call results",
                self.max_temp
            )));
        }
        let id = self.temp_w;
        self.temp_w += 1;
        Ok(id)
    }

    /// Record that one previously-allocated temporary has been consumed by
    /// the expression that hoisted it.
    pub fn consume_temp(&mut self) {
        self.temp_r += 1;
    }

    /// Assert `tempW == tempR` at function end.
    pub fn check_balanced(&self) -> Result<(), BackendError> {
        if self.temp_w != self.temp_r {
            return Err(BackendError::InternalInvariant(format!(
                "temporary write/read cursors diverged: tempW={} tempR={}",
                self.temp_w, self.temp_r
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs() -> FuncScratch {
        FuncScratch::new(true, true, Some("bar".to_string()), 1_000_000, 10_000)
    }

    #[test]
    fn jump_targets_are_dense_and_stable() {
        let mut fs = fs();
        let loop_a = LoopId(5);
        let loop_b = LoopId(9);
        assert_eq!(fs.jump_target(loop_a).unwrap(), 0);
        assert_eq!(fs.jump_target(loop_b).unwrap(), 1);
        assert_eq!(fs.jump_target(loop_a).unwrap(), 0);
    }

    #[test]
    fn too_many_jump_targets_is_rejected() {
        let mut fs = FuncScratch::new(true, true, None, 1, 10_000);
        fs.jump_target(LoopId(0)).unwrap();
        assert!(matches!(
            fs.jump_target(LoopId(1)),
            Err(BackendError::TooManyJumpTargets(_))
        ));
    }

    #[test]
    fn temp_budget_is_enforced() {
        let mut fs = FuncScratch::new(true, true, None, 1_000_000, 2);
        fs.alloc_temp().unwrap();
        fs.alloc_temp().unwrap();
        assert!(matches!(
            fs.alloc_temp(),
            Err(BackendError::TooManyTemporaries(_))
        ));
    }

    #[test]
    fn balance_check_catches_divergence() {
        let mut fs = fs();
        fs.alloc_temp().unwrap();
        assert!(matches!(
            fs.check_balanced(),
            Err(BackendError::InternalInvariant(_))
        ));
        fs.consume_temp();
        assert!(fs.check_balanced().is_ok());
    }

    #[test]
    fn exit_stmt_differs_by_visibility() {
        let public = FuncScratch::new(true, true, None, 1_000_000, 10_000);
        let private = FuncScratch::new(false, true, None, 1_000_000, 10_000);
        assert_eq!(public.exit_stmt(), "goto cleanup0;");
        assert_eq!(private.exit_stmt(), "return status;");
    }
}
