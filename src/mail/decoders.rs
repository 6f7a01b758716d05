pub fn decode_subject(raw: &[u8]) -> String {
    // mailparse expects a full "Key: value" header line
    let mut line = b"Subject: ".to_vec();
    line.extend_from_slice(raw);
    line.extend_from_slice(b"\r\n");

    match mailparse::parse_header(&line) {
        Ok((h, _idx)) => h.get_value(), // decodes RFC 2047
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    }
}

/// Quotes a search term for use inside an IMAP `SUBJECT` criterion.
pub fn quote_imap_string(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('"');
    for ch in term.chars() {
        match ch {
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            // CR/LF would end the command line
            '\r' | '\n' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Builds the `SEARCH` criteria for a subject filter. Non-ASCII terms
/// need an explicit charset or servers answer BAD.
pub fn subject_search_query(term: &str) -> String {
    let quoted = quote_imap_string(term);
    if term.is_ascii() {
        format!("SUBJECT {quoted}")
    } else {
        format!("CHARSET UTF-8 SUBJECT {quoted}")
    }
}
