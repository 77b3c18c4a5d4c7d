use crate::models::{Device, Playlist, Track};

/// Normalization for search (lowercase, collapse whitespace)
pub fn normalize_name(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Split a free-text query into normalized search terms
pub fn split_terms(query: &str) -> Vec<String> {
    query.split_whitespace().map(normalize_name).collect()
}

/// Anything a user can search for by name
pub trait Searchable {
    fn search_name(&self) -> &str;
}

impl Searchable for Track {
    fn search_name(&self) -> &str {
        &self.name
    }
}

impl Searchable for Playlist {
    fn search_name(&self) -> &str {
        &self.name
    }
}

impl Searchable for Device {
    fn search_name(&self) -> &str {
        &self.name
    }
}

/// True when every term occurs somewhere in the normalized name
pub fn matches_all<S: AsRef<str>>(terms: &[S], name: &str) -> bool {
    let name = normalize_name(name);
    terms
        .iter()
        .map(|term| normalize_name(term.as_ref()))
        .all(|term| name.contains(&term))
}

/// Keep the candidates matching all terms, in their original order
pub fn search<'a, T: Searchable, S: AsRef<str>>(terms: &[S], candidates: &'a [T]) -> Vec<&'a T> {
    candidates
        .iter()
        .filter(|c| matches_all(terms, c.search_name()))
        .collect()
}

pub fn search_tracks<'a, S: AsRef<str>>(terms: &[S], candidates: &'a [Track]) -> Vec<&'a Track> {
    search(terms, candidates)
}

pub fn search_playlists<'a, S: AsRef<str>>(terms: &[S], candidates: &'a [Playlist]) -> Vec<&'a Playlist> {
    search(terms, candidates)
}

/// Inactive devices first, then by name (case-insensitive)
pub fn sort_devices_for_display(devices: &mut [Device]) {
    devices.sort_by(|a, b| {
        a.is_active
            .cmp(&b.is_active)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str) -> Track {
        Track {
            id: name.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Interview \t Part   Two "), "interview part two");
    }

    #[test]
    fn test_search_requires_all_terms() {
        let candidates = vec![
            track("Foo Fighters - Everlong"),
            track("foobar"),
            track("Bar Talk"),
            track("FOO   and BAR session"),
        ];

        let found = search_tracks(&["foo", "bar"], &candidates);
        let names: Vec<_> = found.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["foobar", "FOO   and BAR session"]);
    }

    #[test]
    fn test_search_with_query_terms() {
        let candidates = vec![track("Morning Interview"), track("Evening interview")];
        let terms = split_terms("  INTERVIEW   morning ");
        let found = search_tracks(&terms, &candidates);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Morning Interview");
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let candidates = vec![track("a"), track("b")];
        let terms: Vec<String> = Vec::new();
        assert_eq!(search_tracks(&terms, &candidates).len(), 2);
    }

    #[test]
    fn test_sort_devices_for_display() {
        let mut devices = vec![
            Device { id: "1".into(), name: "speakers".into(), is_active: true },
            Device { id: "2".into(), name: "Kitchen".into(), is_active: false },
            Device { id: "3".into(), name: "Attic".into(), is_active: false },
        ];
        sort_devices_for_display(&mut devices);
        let ids: Vec<_> = devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }
}
