use url::Url;

// ── Reactions ─────────────────────────────────────────────────────────────────

/// Normalise a reaction count read from the page.
///
/// Keeps the site's own spelling when it looks like a count
/// ("7" | "1,204" | "1.2K" | "3 M"), anything else becomes "0".
pub fn normalise_reactions(raw: Option<&str>) -> String {
    let Some(s) = raw.map(str::trim) else {
        return "0".to_string();
    };
    if parse_count_shorthand(s).is_some() {
        s.to_string()
    } else {
        "0".to_string()
    }
}

/// Parse counts with K/M/B suffixes.
/// "1.2M" → 1,200,000 | "345K" → 345,000 | "1,234" → 1234
pub fn parse_count_shorthand(s: &str) -> Option<u64> {
    let s = s.trim().to_uppercase().replace([',', ' ', '\u{a0}'], "");
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('B') {
        (n, 1_000_000_000.0)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1_000_000.0)
    } else if let Some(n) = s.strip_suffix('K') {
        (n, 1_000.0)
    } else {
        if !s.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        return s.parse().ok();
    };

    if num_str.is_empty() || !num_str.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let num: f64 = num_str.parse().ok()?;
    Some((num * multiplier) as u64)
}

// ── Links ─────────────────────────────────────────────────────────────────────

/// Resolve an href against the site origin unless it already carries a scheme.
/// "/groups/42/posts/7" → "https://m.facebook.com/groups/42/posts/7"
pub fn absolutise(href: &str, origin: &Url) -> String {
    let href = href.trim();
    if href.starts_with("http") {
        return href.to_string();
    }
    match origin.join(href) {
        Ok(u) => u.to_string(),
        Err(_) => format!("{}{}", origin.as_str().trim_end_matches('/'), href),
    }
}

// ── Text ──────────────────────────────────────────────────────────────────────

pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
