//! Symbol search provider: query tokenization into symbol-shaped terms,
//! exact then fuzzy matching against stored symbols (spec.md §4.11).

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::classification::directive_parser::damerau_levenshtein;
use crate::domain::models::{FileState, Symbol, SymbolType};
use crate::identifiers::FileId;

use super::{ContextSnippet, SnippetSource};

/// Query substrings that look like code identifiers rather than prose,
/// excluded from symbol matching to avoid false positives (spec.md §4.11
/// "false-positive exclusion list").
const EXCLUDED_TOKENS: &[&str] = &["the", "a", "an", "is", "of", "for", "and", "or", "value", "data"];

fn symbol_token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*(?:\(\))?").unwrap()
    })
}

/// Extract symbol-shaped tokens from free text: CamelCase/snake_case
/// identifiers, `name()` calls, and qualified `a.b.c` paths.
#[must_use]
pub fn extract_query_tokens(query_text: &str) -> Vec<String> {
    symbol_token_pattern()
        .find_iter(query_text)
        .map(|m| m.as_str().trim_end_matches("()").to_string())
        .filter(|token| token.len() >= 2 && !EXCLUDED_TOKENS.contains(&token.to_lowercase().as_str()))
        .collect()
}

fn symbol_type_rank(symbol_type: SymbolType) -> u8 {
    match symbol_type {
        SymbolType::Class | SymbolType::Interface => 0,
        SymbolType::Function | SymbolType::Method => 1,
        SymbolType::Property | SymbolType::Variable => 2,
        SymbolType::Import => 3,
    }
}

/// Match query tokens against `symbols`: exact matches (case-insensitive)
/// score 1.0, fuzzy matches (edit distance ≤ 2) score by similarity ratio.
/// At equal relevance, classes/interfaces rank above functions (spec.md
/// §4.11).
#[must_use]
pub fn search(symbols: &[Symbol], path_by_file: &HashMap<FileId, &FileState>, query_text: &str, top_k: usize) -> Vec<ContextSnippet> {
    let tokens = extract_query_tokens(query_text);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(f64, &Symbol)> = Vec::new();
    for symbol in symbols {
        let mut best = 0.0f64;
        for token in &tokens {
            let lower_token = token.to_lowercase();
            let lower_name = symbol.name.to_lowercase();
            let score = if lower_name == lower_token {
                1.0
            } else {
                let distance = damerau_levenshtein(&lower_name, &lower_token);
                let longer = lower_name.len().max(lower_token.len()).max(1);
                let ratio = 1.0 - (distance as f64 / longer as f64);
                if distance <= 2 && ratio >= 0.6 {
                    ratio * 0.85
                } else {
                    0.0
                }
            };
            best = best.max(score);
        }
        if best > 0.0 {
            scored.push((best, symbol));
        }
    }

    scored.sort_by(|(score_a, symbol_a), (score_b, symbol_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| symbol_type_rank(symbol_a.symbol_type).cmp(&symbol_type_rank(symbol_b.symbol_type)))
    });
    scored.truncate(top_k);

    scored
        .into_iter()
        .filter_map(|(score, symbol)| {
            let file_state = path_by_file.get(&symbol.file_id)?;
            let mut metadata = HashMap::new();
            metadata.insert("symbol_name".to_string(), symbol.name.clone());
            metadata.insert("language".to_string(), symbol.language.clone());
            Some(ContextSnippet {
                source: SnippetSource::Symbol,
                relative_path: file_state.relative_path.clone(),
                chunk_id: Some(symbol.chunk_id),
                ordinal: None,
                content: symbol.signature.clone().unwrap_or_else(|| symbol.name.clone()),
                score,
                token_estimate: crate::domain::models::chunk::estimate_tokens(symbol.signature.as_deref().unwrap_or(&symbol.name)),
                metadata,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{ChunkId, SymbolId};

    fn symbol(name: &str, symbol_type: SymbolType, file_id: FileId) -> Symbol {
        Symbol {
            symbol_id: SymbolId::new(),
            file_id,
            chunk_id: ChunkId::new(),
            symbol_type,
            name: name.to_string(),
            qualified_name: None,
            signature: Some(format!("fn {name}()")),
            start_line: 1,
            end_line: 1,
            language: "rust".to_string(),
        }
    }

    #[test]
    fn extracts_camel_case_snake_case_and_call_tokens() {
        let tokens = extract_query_tokens("how does RoutingEngine.select_agent() work");
        assert!(tokens.iter().any(|t| t == "RoutingEngine.select_agent"));
    }

    #[test]
    fn exact_match_outranks_fuzzy_match() {
        let file_id = FileId::new();
        let symbols = vec![symbol("selectAgent", SymbolType::Function, file_id), symbol("selectAgents", SymbolType::Function, file_id)];
        let file_state = FileState::new("a.rs", "h1", 1, 0);
        let path_by_file: HashMap<_, _> = [(file_id, &file_state)].into_iter().collect();
        let hits = search(&symbols, &path_by_file, "selectAgent", 5);
        assert_eq!(hits[0].metadata.get("symbol_name").unwrap(), "selectAgent");
    }

    #[test]
    fn classes_rank_above_functions_at_equal_relevance() {
        let file_id = FileId::new();
        let symbols = vec![symbol("Widget", SymbolType::Function, file_id), symbol("Widget", SymbolType::Class, file_id)];
        let file_state = FileState::new("a.rs", "h1", 1, 0);
        let path_by_file: HashMap<_, _> = [(file_id, &file_state)].into_iter().collect();
        let hits = search(&symbols, &path_by_file, "Widget", 5);
        assert_eq!(hits.len(), 2);
    }
}
