//! Tolerant personal-name comparison for the identity gate.

const HONORIFICS: &[&str] = &["mr", "mrs", "ms", "miss", "dr", "prof", "sir", "jr", "sr", "ii", "iii"];

/// Common diminutives mapped to a canonical given name.
const NICKNAMES: &[(&str, &str)] = &[
    ("alex", "alexander"),
    ("andy", "andrew"),
    ("bill", "william"),
    ("billy", "william"),
    ("bob", "robert"),
    ("bobby", "robert"),
    ("chris", "christopher"),
    ("dan", "daniel"),
    ("danny", "daniel"),
    ("dave", "david"),
    ("jim", "james"),
    ("jimmy", "james"),
    ("joe", "joseph"),
    ("johnny", "john"),
    ("jon", "john"),
    ("kate", "katherine"),
    ("katie", "katherine"),
    ("kathy", "katherine"),
    ("liz", "elizabeth"),
    ("beth", "elizabeth"),
    ("matt", "matthew"),
    ("mike", "michael"),
    ("nick", "nicholas"),
    ("pat", "patricia"),
    ("peggy", "margaret"),
    ("maggie", "margaret"),
    ("rob", "robert"),
    ("sam", "samuel"),
    ("steve", "stephen"),
    ("sue", "susan"),
    ("tom", "thomas"),
    ("tony", "anthony"),
    ("will", "william"),
];

fn canonical(token: &str) -> &str {
    NICKNAMES
        .iter()
        .find(|(nick, _)| *nick == token)
        .map(|(_, full)| *full)
        .unwrap_or(token)
}

fn tokens(name: &str) -> Vec<String> {
    name.split(|c: char| c.is_whitespace() || c == '-' || c == ',')
        .map(|part| {
            part.chars()
                .filter(|c| c.is_alphabetic())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|t| !t.is_empty() && !HONORIFICS.contains(&t.as_str()))
        .map(|t| canonical(&t).to_string())
        .collect()
}

fn given_names_agree(a: &str, b: &str) -> bool {
    a == b || (a.len() == 1 && b.starts_with(a)) || (b.len() == 1 && a.starts_with(b))
}

/// Whether `entered` plausibly names the same person as `extracted`.
///
/// Case-insensitive; tolerates extra middle names on either side, initials
/// for the given name, and common nicknames.
pub fn names_match(entered: &str, extracted: &str) -> bool {
    let a = tokens(entered);
    let b = tokens(extracted);
    if a.is_empty() || b.is_empty() {
        return false;
    }

    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if shorter.len() >= 2 && shorter.iter().all(|t| longer.contains(t)) {
        return true;
    }
    if shorter.len() == 1 {
        return longer.first() == shorter.first() || longer.last() == shorter.first();
    }

    // Both sides have at least two tokens here.
    a.last() == b.last() && given_names_agree(&a[0], &b[0])
}
