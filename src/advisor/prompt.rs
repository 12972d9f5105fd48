use crate::reports::service::{BudgetStatus, Summary};

pub const SYSTEM_INSTRUCTION: &str = "You are a certified financial advisor. Provide specific, actionable advice based on the user transaction history. Break down complex concepts into simple terms. Always suggest concrete steps. Keep response under 500 characters.";

pub const FALLBACK: &str =
    "I'm having trouble connecting to provide advice right now. Please try again in a moment.";

pub const UNCONFIGURED: &str =
    "AI advice is currently unavailable. Please configure the API key.";

/// Keeps the assembled prompt bounded no matter what the client sends.
const MAX_QUESTION_CHARS: usize = 500;

pub fn build_prompt(summary: &Summary, budgets: &[BudgetStatus], question: &str) -> String {
    let budget_text = if budgets.is_empty() {
        "No budgets created".to_string()
    } else {
        budgets
            .iter()
            .map(|b| {
                format!(
                    "{} ({}): Limit ${:.2}, Spent ${:.2}, Remaining ${:.2}",
                    b.category, b.month, b.limit, b.spent, b.remaining
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    let question: String = question.chars().take(MAX_QUESTION_CHARS).collect();

    format!(
        "User's Financial Summary:\n\
         - Total Income: ${:.2}\n\
         - Total Expenses: ${:.2}\n\
         - Current Balance: ${:.2}\n\
         - Number of Transactions: {}\n\n\
         Budget Summary:\n\
         {}\n\n\
         User Question: {}\n\n\
         Please provide helpful, practical financial advice based on their situation. \
         Break down complex concepts into simple terms. Always suggest concrete steps. \
         Keep the response concise and actionable (500-700 characters).",
        summary.income,
        summary.expenses,
        summary.balance,
        summary.transaction_count,
        budget_text,
        question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> Summary {
        Summary {
            income: 1000.0,
            expenses: 250.0,
            balance: 750.0,
            transaction_count: 2,
        }
    }

    #[test]
    fn prompt_embeds_summary_and_question() {
        let prompt = build_prompt(&summary(), &[], "How can I save more?");
        assert!(prompt.contains("Total Income: $1000.00"));
        assert!(prompt.contains("Total Expenses: $250.00"));
        assert!(prompt.contains("Current Balance: $750.00"));
        assert!(prompt.contains("Number of Transactions: 2"));
        assert!(prompt.contains("No budgets created"));
        assert!(prompt.contains("User Question: How can I save more?"));
    }

    #[test]
    fn prompt_lists_budget_rows() {
        let budgets = vec![BudgetStatus {
            id: 1,
            category: "food".into(),
            month: "2026-08".into(),
            limit: 200.0,
            spent: 250.0,
            remaining: -50.0,
        }];
        let prompt = build_prompt(&summary(), &budgets, "am I over budget?");
        assert!(prompt.contains("food (2026-08): Limit $200.00, Spent $250.00, Remaining $-50.00"));
    }

    #[test]
    fn oversized_questions_are_truncated() {
        let question = "x".repeat(5000);
        let prompt = build_prompt(&summary(), &[], &question);
        assert!(!prompt.contains(&question));
        assert!(prompt.contains(&"x".repeat(MAX_QUESTION_CHARS)));
    }
}
