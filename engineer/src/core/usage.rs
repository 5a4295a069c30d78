//! Per-request token accounting and the `token_usage` log summary.

pub const USAGE_CSV_HEADER: &str = "step_name,prompt_tokens_in_step,completion_tokens_in_step,total_tokens_in_step,total_prompt_tokens,total_completion_tokens,total_tokens";

/// Usage recorded for one model request, with running totals at that point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUsage {
    pub step_name: String,
    pub prompt_tokens_in_step: usize,
    pub completion_tokens_in_step: usize,
    pub total_tokens_in_step: usize,
    pub total_prompt_tokens: usize,
    pub total_completion_tokens: usize,
    pub total_tokens: usize,
}

/// Append-only ledger of token usage across a run.
#[derive(Debug, Clone, Default)]
pub struct UsageLedger {
    entries: Vec<TokenUsage>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step_name: &str, prompt_tokens: usize, completion_tokens: usize) {
        let (total_prompt, total_completion) = self
            .entries
            .last()
            .map(|last| (last.total_prompt_tokens, last.total_completion_tokens))
            .unwrap_or((0, 0));
        let total_prompt_tokens = total_prompt + prompt_tokens;
        let total_completion_tokens = total_completion + completion_tokens;
        self.entries.push(TokenUsage {
            step_name: step_name.to_string(),
            prompt_tokens_in_step: prompt_tokens,
            completion_tokens_in_step: completion_tokens,
            total_tokens_in_step: prompt_tokens + completion_tokens,
            total_prompt_tokens,
            total_completion_tokens,
            total_tokens: total_prompt_tokens + total_completion_tokens,
        });
    }

    pub fn entries(&self) -> &[TokenUsage] {
        &self.entries
    }

    pub fn total_tokens(&self) -> usize {
        self.entries.last().map(|e| e.total_tokens).unwrap_or(0)
    }

    /// CSV rendering: header plus one row per request.
    pub fn to_csv(&self) -> String {
        let mut out = String::from(USAGE_CSV_HEADER);
        out.push('\n');
        for e in &self.entries {
            out.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                e.step_name,
                e.prompt_tokens_in_step,
                e.completion_tokens_in_step,
                e.total_tokens_in_step,
                e.total_prompt_tokens,
                e.total_completion_tokens,
                e.total_tokens
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_accumulate_across_requests() {
        let mut ledger = UsageLedger::new();
        ledger.record("simple_gen", 100, 40);
        ledger.record("gen_entrypoint", 30, 10);

        let last = ledger.entries().last().expect("entry");
        assert_eq!(last.total_prompt_tokens, 130);
        assert_eq!(last.total_completion_tokens, 50);
        assert_eq!(ledger.total_tokens(), 180);
    }

    #[test]
    fn empty_ledger_renders_header_only() {
        let csv = UsageLedger::new().to_csv();
        assert_eq!(csv, format!("{USAGE_CSV_HEADER}\n"));
    }

    #[test]
    fn csv_rows_follow_request_order() {
        let mut ledger = UsageLedger::new();
        ledger.record("a", 1, 2);
        ledger.record("b", 3, 4);
        let csv = ledger.to_csv();
        let rows: Vec<&str> = csv.lines().skip(1).collect();
        assert_eq!(rows, vec!["a,1,2,3,1,2,3", "b,3,4,7,4,6,10"]);
    }
}
