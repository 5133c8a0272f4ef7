/// Turn a markdown reply into plain text suitable for speech.
///
/// Fenced code blocks are spoken as "code block", inline code and link text
/// are kept, markup characters are dropped and whitespace is collapsed.
pub fn clean_text_for_speech(text: &str) -> String {
    let mut cleaned = text.to_string();

    // Fenced code blocks (multiline)
    while let Some(start) = cleaned.find("```") {
        match cleaned[start + 3..].find("```") {
            Some(end) => cleaned.replace_range(start..start + end + 6, " code block "),
            None => break,
        }
    }

    // Inline code keeps its content
    while let Some(start) = cleaned.find('`') {
        match cleaned[start + 1..].find('`') {
            Some(end) => {
                let code = cleaned[start + 1..start + 1 + end].to_string();
                cleaned.replace_range(start..start + end + 2, &code);
            }
            None => break,
        }
    }

    // [text](url) -> text
    let mut pos = 0;
    while let Some(start) = cleaned[pos..].find('[') {
        let start = pos + start;
        let Some(mid) = cleaned[start + 1..].find(']').map(|m| start + 1 + m) else {
            break;
        };
        if cleaned[mid + 1..].starts_with('(') {
            if let Some(end) = cleaned[mid + 1..].find(')').map(|e| mid + 1 + e) {
                let link_text = cleaned[start + 1..mid].to_string();
                cleaned.replace_range(start..end + 1, &link_text);
                pos = start + link_text.len();
                continue;
            }
        }
        pos = mid + 1;
    }

    // Heading and list markers at line start
    cleaned = cleaned
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') {
                trimmed.trim_start_matches('#').trim_start()
            } else if let Some(rest) = trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))
                .or_else(|| trimmed.strip_prefix("+ "))
            {
                rest
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    // Remaining markup characters
    cleaned.retain(|c| !matches!(c, '*' | '_' | '#' | '[' | ']' | '(' | ')' | '~'));

    // Collapse whitespace, newlines included
    let mut result = String::with_capacity(cleaned.len());
    for word in cleaned.split_whitespace() {
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(word);
    }

    // No space before punctuation
    for punct in [",", ".", "!", "?", ";", ":"] {
        result = result.replace(&format!(" {punct}"), punct);
    }

    result
}
