use regex::Regex;
use std::sync::LazyLock;

static ANGLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^<|>$").unwrap());
static SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://").unwrap());
static WIKI_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*\.(?:wikia|fandom|gamepedia)\.(?:com|org|io)/(?:wiki/)?").unwrap()
});
static USER_PAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:User:|Special:Contributions/|Special:Contribs/)").unwrap()
});
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%20|_").unwrap());

/// Turn whatever an operator pasted (a mention, a profile URL, a
/// contributions link) into a bare username.
pub fn clean_user(raw: &str) -> String {
    let user = raw.trim();
    let user = ANGLE_RE.replace_all(user, "");
    let user = SCHEME_RE.replace(&user, "");
    let user = WIKI_URL_RE.replace(&user, "");
    let user = USER_PAGE_RE.replace(&user, "");
    let user = SPACE_RE.replace_all(&user, " ");

    let mut chars = user.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
