use axum::http::{header, HeaderMap, HeaderValue};

/// Browsers reject cookies much past 4KB; session values are split into
/// `name.0`, `name.1`, ... above this size.
pub const MAX_CHUNK_SIZE: usize = 3180;

/// Lifetime of cookies written for a session (400 days).
const SESSION_MAX_AGE_SECS: i64 = 400 * 24 * 60 * 60;

/// True for `sb-<ref>-auth-token` and its numbered chunks.
pub fn is_auth_token_cookie(name: &str) -> bool {
    if !name.starts_with("sb-") {
        return false;
    }
    let base = match name.rsplit_once('.') {
        Some((base, chunk)) if !chunk.is_empty() && chunk.chars().all(|c| c.is_ascii_digit()) => {
            base
        }
        _ => name,
    };
    base.ends_with("-auth-token")
}

/// A pending `Set-Cookie` write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub max_age: i64,
    pub secure: bool,
}

impl SetCookie {
    pub fn session(name: impl Into<String>, value: impl Into<String>, secure: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: SESSION_MAX_AGE_SECS,
            secure,
        }
    }

    /// Expires the cookie in the browser.
    pub fn removal(name: impl Into<String>, secure: bool) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            max_age: 0,
            secure,
        }
    }

    pub fn is_removal(&self) -> bool {
        self.max_age <= 0
    }

    pub fn to_header_string(&self) -> String {
        let mut out = format!(
            "{}={}; Path=/; Max-Age={}; SameSite=Lax",
            self.name, self.value, self.max_age
        );
        if self.secure {
            out.push_str("; Secure");
        }
        out
    }

    pub fn to_header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.to_header_string()).ok()
    }
}

/// Per-request cookie view shared with the identity provider: the cookies
/// the browser sent plus writes that must reach the response.
///
/// Reads observe pending writes, so a session refreshed earlier in the
/// request is what later steps see.
#[derive(Debug, Clone, Default)]
pub struct SessionCookies {
    incoming: Vec<(String, String)>,
    pending: Vec<SetCookie>,
}

impl SessionCookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let incoming = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(parse_cookie_header)
            .collect();

        Self {
            incoming,
            pending: Vec::new(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            incoming: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            pending: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        if let Some(write) = self.pending.iter().find(|c| c.name == name) {
            return (!write.is_removal()).then_some(write.value.as_str());
        }
        self.incoming
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Names of every live cookie, incoming or pending.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self
            .incoming
            .iter()
            .map(|(k, _)| k)
            .chain(self.pending.iter().map(|c| &c.name))
        {
            if self.get(name).is_some() && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Queues a write, replacing any earlier write to the same name.
    pub fn set(&mut self, cookie: SetCookie) {
        self.pending.retain(|c| c.name != cookie.name);
        self.pending.push(cookie);
    }

    /// Whether the browser sent any session token cookie with the request.
    /// Pending writes are ignored.
    pub fn has_session_artifacts(&self) -> bool {
        self.incoming.iter().any(|(k, _)| is_auth_token_cookie(k))
    }

    /// Reads `name`, reassembling `name.0`, `name.1`, ... when the value was
    /// split.
    pub fn get_chunked(&self, name: &str) -> Option<String> {
        if let Some(value) = self.get(name) {
            return Some(value.to_string());
        }

        let mut joined = String::new();
        let mut index = 0;
        while let Some(chunk) = self.get(&format!("{}.{}", name, index)) {
            joined.push_str(chunk);
            index += 1;
        }
        (index > 0).then_some(joined)
    }

    /// Writes `value` under `name`, chunking when it is too large and
    /// expiring whatever chunks or unchunked cookie it replaces.
    pub fn set_chunked(&mut self, name: &str, value: &str, secure: bool) {
        let stale: Vec<String> = self
            .names()
            .into_iter()
            .filter(|n| n == name || is_chunk_of(n, name))
            .collect();

        let mut written = Vec::new();
        if value.len() <= MAX_CHUNK_SIZE {
            written.push(name.to_string());
            self.set(SetCookie::session(name, value, secure));
        } else {
            let bytes = value.as_bytes();
            for (index, chunk) in bytes.chunks(MAX_CHUNK_SIZE).enumerate() {
                let chunk_name = format!("{}.{}", name, index);
                let chunk_value = String::from_utf8_lossy(chunk).into_owned();
                written.push(chunk_name.clone());
                self.set(SetCookie::session(chunk_name, chunk_value, secure));
            }
        }

        for old in stale.into_iter().filter(|n| !written.contains(n)) {
            self.set(SetCookie::removal(old, secure));
        }
    }

    pub fn pending(&self) -> &[SetCookie] {
        &self.pending
    }

    pub fn into_pending(self) -> Vec<SetCookie> {
        self.pending
    }
}

fn is_chunk_of(candidate: &str, name: &str) -> bool {
    candidate
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix('.'))
        .map(|index| !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

/// Splits a `Cookie` header into name/value pairs. Malformed pairs are skipped.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"');
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
