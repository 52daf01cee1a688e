//! Tokenizer - shared by the index and query paths / 分词器
//!
//! The dataset language is operator-configured, so no dictionary segmentation
//! is used: text is lowercased and split into unicode runs. A run of
//! alphanumerics is one token, a run of CJK characters is one token,
//! everything else separates. Type-ahead comes from prefix matching in the
//! engine, e.g. query "つ" prefix-matches the indexed token "つるはし".

/// Tokenize text for indexing / 对文本进行分词
pub fn tokenize(text: &str) -> Vec<String> {
    #[derive(PartialEq, Clone, Copy)]
    enum Kind {
        Alnum,
        Cjk,
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_kind = None;

    let mut flush = |current: &mut String, kind: &mut Option<Kind>| {
        if !current.is_empty() {
            tokens.push(std::mem::take(current));
        }
        *kind = None;
    };

    for c in text.chars() {
        let kind = if is_cjk(c) {
            Some(Kind::Cjk)
        } else if c.is_alphanumeric() {
            Some(Kind::Alnum)
        } else {
            None
        };

        match kind {
            None => flush(&mut current, &mut current_kind),
            Some(kind) => {
                if current_kind.is_some() && current_kind != Some(kind) {
                    flush(&mut current, &mut current_kind);
                }
                current_kind = Some(kind);
                for lower in c.to_lowercase() {
                    current.push(lower);
                }
            }
        }
    }
    flush(&mut current, &mut current_kind);

    tokens
}

/// Tokenize a search query / 对搜索查询进行分词
///
/// Must stay consistent with index tokenization / 查询分词与索引分词保持一致
pub fn tokenize_query(query: &str) -> Vec<String> {
    tokenize(query)
}

/// Check if a character is CJK (Chinese, Japanese, Korean) / 检测CJK字符
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4e00}'..='\u{9fff}' |  // CJK Unified Ideographs
        '\u{3400}'..='\u{4dbf}' |  // CJK Extension A
        '\u{3040}'..='\u{309f}' |  // Hiragana
        '\u{30a0}'..='\u{30ff}' |  // Katakana
        '\u{ac00}'..='\u{d7af}'    // Hangul Syllables
    )
}
