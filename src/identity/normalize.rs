use url::Url;

/// Normalize a captured URL so it can take part in screen identity.
///
/// Fragments are dropped, query parameters are kept only when their name is
/// in `query_allow_list` (sorted for stability) and a trailing slash on a
/// non-root path is removed. Unparseable input is trimmed and lowercased.
pub fn normalize_url(raw: &str, query_allow_list: &[String]) -> String {
    let parsed = match Url::parse(raw.trim()) {
        Ok(u) => u,
        Err(_) => return raw.trim().to_lowercase(),
    };

    let mut out = format!("{}://", parsed.scheme());
    if let Some(host) = parsed.host_str() {
        out.push_str(host);
    }
    if let Some(port) = parsed.port() {
        out.push_str(&format!(":{}", port));
    }

    let path = parsed.path();
    if path.len() > 1 {
        out.push_str(path.trim_end_matches('/'));
    } else {
        out.push('/');
    }

    let mut kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| query_allow_list.iter().any(|a| a == k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    kept.sort();

    if !kept.is_empty() {
        let query = kept
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        out.push('?');
        out.push_str(&query);
    }

    out
}

/// Whether `candidate` (absolute, or relative to `base`) stays on `base`'s host.
pub fn same_domain(base: &str, candidate: &str) -> bool {
    let Ok(base_url) = Url::parse(base) else {
        return false;
    };
    match base_url.join(candidate.trim()) {
        Ok(target) => base_url.host_str().is_some() && base_url.host_str() == target.host_str(),
        Err(_) => false,
    }
}
