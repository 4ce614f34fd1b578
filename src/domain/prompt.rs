//! Prompt - 提示词构建
//!
//! 预测市场问题 → LLM 提示词，可选附带网页搜索上下文

/// 搜索结果摘要中保留的最大字符数
const SNIPPET_MAX_CHARS: usize = 200;

/// 预测市场问题的识别关键词（小写）
const MARKET_KEYWORDS: &[&str] = &[
    "prediction market",
    "market question",
    "please respond with yes or no",
];

/// 单条搜索结果（用于拼接上下文）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSnippet {
    pub title: String,
    pub content: String,
    pub url: String,
}

/// 判断任务文本是否为预测市场问题
pub fn is_prediction_market_question(text: &str) -> bool {
    let lower = text.to_lowercase();
    MARKET_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// 将搜索结果格式化为编号的上下文块
pub fn format_search_context(results: &[SearchSnippet]) -> String {
    let mut context = String::from("Web search results:\n\n");
    for (i, result) in results.iter().enumerate() {
        let snippet: String = result.content.chars().take(SNIPPET_MAX_CHARS).collect();
        context.push_str(&format!("{}. {}\n", i + 1, result.title));
        context.push_str(&format!("   {}...\n", snippet));
        context.push_str(&format!("   Source: {}\n\n", result.url));
    }
    context
}

/// 构建发送给 LLM 的提示词
///
/// 有搜索结果时，问题前附加搜索上下文
pub fn build_prompt(question: &str, search_results: Option<&[SearchSnippet]>) -> String {
    let base = format!(
        "You are evaluating a prediction market question.\n\
         Your task is to respond with either YES or NO, followed by a brief explanation of your reasoning.\n\n\
         Question: {}\n\n\
         Response format: Start with YES or NO (capitalized), followed by your explanation.",
        question.trim()
    );

    match search_results {
        Some(results) if !results.is_empty() => format!(
            "Here is some relevant information from the web:\n\n{}\nBased on this information, please answer.\n\n{}",
            format_search_context(results),
            base
        ),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(title: &str, content: &str) -> SearchSnippet {
        SearchSnippet {
            title: title.to_string(),
            content: content.to_string(),
            url: format!("https://example.com/{}", title),
        }
    }

    #[test]
    fn test_market_question_detection() {
        assert!(is_prediction_market_question(
            "Prediction market question: Will BTC exceed $100k?"
        ));
        assert!(is_prediction_market_question(
            "Will it snow? Please respond with YES or NO."
        ));
        assert!(!is_prediction_market_question("Summarise this article"));
    }

    #[test]
    fn test_prompt_without_search() {
        let prompt = build_prompt("  Will AI replace developers by 2030?  ", None);
        assert!(prompt.contains("Question: Will AI replace developers by 2030?\n"));
        assert!(prompt.starts_with("You are evaluating a prediction market question."));
        assert!(!prompt.contains("Web search results"));
    }

    #[test]
    fn test_prompt_with_empty_search_falls_back() {
        let prompt = build_prompt("Q?", Some(&[]));
        assert_eq!(prompt, build_prompt("Q?", None));
    }

    #[test]
    fn test_search_context_truncates_by_chars() {
        let long = "é".repeat(500);
        let context = format_search_context(&[snippet("a", &long), snippet("b", "short")]);
        assert!(context.contains("1. a\n"));
        assert!(context.contains("2. b\n"));
        assert!(context.contains(&format!("   {}...\n", "é".repeat(200))));
        assert!(!context.contains(&"é".repeat(201)));
        assert!(context.contains("Source: https://example.com/b"));
    }

    #[test]
    fn test_prompt_with_search() {
        let prompt = build_prompt("Q?", Some(&[snippet("news", "facts")]));
        assert!(prompt.starts_with("Here is some relevant information from the web:"));
        assert!(prompt.contains("Question: Q?"));
    }
}
