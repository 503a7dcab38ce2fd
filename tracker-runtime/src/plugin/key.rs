/// Derive a registry key from a Rust type name.
///
/// Generic arguments and the module path are dropped before conversion, so
/// `my_crate::cal::OutlookCalendar<Foo>` becomes `outlook_calendar`.
pub fn plugin_key(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let last = base.rsplit("::").next().unwrap_or(base);
    pascal_to_snake(last)
}

/// Convert a PascalCase identifier to snake_case.
///
/// Runs of capitals are kept together as one word: `HTTPClient` becomes
/// `http_client`. Total over any input; characters without case pass through.
pub fn pascal_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let starts_word = match prev {
                None => false,
                Some(p) if p == '_' => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                // End of an acronym run: "HTTPClient" splits before 'C'
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                Some(_) => false,
            };
            if starts_word {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}
