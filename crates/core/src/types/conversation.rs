use serde::{Deserialize, Serialize};

/// One user message and the agent reply to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user: String,
    pub agent: String,
}

/// Append-only history for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, user: impl Into<String>, agent: impl Into<String>) {
        self.turns.push(ConversationTurn {
            user: user.into(),
            agent: agent.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The last `window` turns, oldest first.
    pub fn recent(&self, window: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(window);
        &self.turns[start..]
    }

    /// Prompt context built from the last `window` turns.
    pub fn context_text(&self, window: usize) -> String {
        self.recent(window)
            .iter()
            .map(|t| format!("User: {}\nAgent: {}", t.user, t.agent))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_window() {
        let mut history = ConversationHistory::new();
        for i in 0..5 {
            history.push(format!("q{}", i), format!("a{}", i));
        }
        assert_eq!(history.len(), 5);

        let recent = history.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].user, "q2");

        let context = history.context_text(3);
        assert!(!context.contains("q1"));
        assert!(context.ends_with("User: q4\nAgent: a4"));

        assert_eq!(history.recent(10).len(), 5);
    }
}
