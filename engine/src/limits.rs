/// Largest number of principal variations a search may report.
pub const MAX_MULTI_PV: u32 = 5;

/// Search limits for a single `go`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisLimits {
    pub depth: Option<u32>,
    pub time_ms: Option<u64>,
    pub multi_pv: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimitsError {
    #[error("at least one of depth or time_ms must be set")]
    Unbounded,
    #[error("depth must be positive")]
    ZeroDepth,
    #[error("time_ms must be positive")]
    ZeroTime,
    #[error("multi_pv must be between 1 and {max}, got {0}", max = MAX_MULTI_PV)]
    MultiPvOutOfRange(u32),
}

impl AnalysisLimits {
    pub fn depth(depth: u32) -> Self {
        Self {
            depth: Some(depth),
            ..Default::default()
        }
    }

    pub fn time_ms(time_ms: u64) -> Self {
        Self {
            time_ms: Some(time_ms),
            ..Default::default()
        }
    }

    pub fn with_time_ms(mut self, time_ms: u64) -> Self {
        self.time_ms = Some(time_ms);
        self
    }

    pub fn with_multi_pv(mut self, multi_pv: u32) -> Self {
        self.multi_pv = Some(multi_pv);
        self
    }

    pub fn validate(&self) -> Result<(), LimitsError> {
        if self.depth.is_none() && self.time_ms.is_none() {
            return Err(LimitsError::Unbounded);
        }
        if self.depth == Some(0) {
            return Err(LimitsError::ZeroDepth);
        }
        if self.time_ms == Some(0) {
            return Err(LimitsError::ZeroTime);
        }
        if let Some(n) = self.multi_pv {
            if !(1..=MAX_MULTI_PV).contains(&n) {
                return Err(LimitsError::MultiPvOutOfRange(n));
            }
        }
        Ok(())
    }

    pub fn multi_pv_count(&self) -> u32 {
        self.multi_pv.unwrap_or(1)
    }

    /// The `go` command for these limits. Depth and movetime may both be
    /// given; the engine stops at whichever is hit first.
    pub(crate) fn go_command(&self) -> String {
        let mut go_cmd = "go".to_string();
        if let Some(depth) = self.depth {
            go_cmd.push_str(&format!(" depth {}", depth));
        }
        if let Some(movetime) = self.time_ms {
            go_cmd.push_str(&format!(" movetime {}", movetime));
        }
        go_cmd
    }
}
