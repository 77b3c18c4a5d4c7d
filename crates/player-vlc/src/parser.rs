//! Decoding of VLC's `requests/status.xml` and `requests/playlist.xml`
//! documents using quick-xml.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use scribectl_core::{Device, ParseError, PlaybackState, Playlist, Status, Track};
use std::collections::HashMap;

/// Category in `<information>` holding the current item's tags
const META_CATEGORY: &str = "meta";

/// One `<category>` block from `<information>`
#[derive(Debug, Clone, Default)]
struct Category {
    name: String,
    infos: HashMap<String, String>,
}

/// Raw fields of a status document before conversion
#[derive(Debug, Default)]
struct RawStatus {
    fields: HashMap<String, String>,
    categories: Vec<Category>,
}

fn xml_error(reader: &Reader<&[u8]>, err: impl std::fmt::Display) -> ParseError {
    ParseError::MalformedXml(format!("at position {}: {}", reader.buffer_position(), err))
}

fn document_text(body: &[u8]) -> Result<&str, ParseError> {
    let text = std::str::from_utf8(body).map_err(|e| ParseError::MalformedXml(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(ParseError::MalformedXml("empty document".to_string()));
    }
    Ok(text)
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

fn attribute(e: &BytesStart, key: &str) -> Result<Option<String>, ParseError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ParseError::MalformedXml(err.to_string()))?;
        if attr.key.as_ref() == key.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|err| ParseError::MalformedXml(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn read_raw_status(text: &str) -> Result<RawStatus, ParseError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut raw = RawStatus::default();
    let mut path: Vec<String> = Vec::new();
    let mut current_text = String::new();
    let mut category: Option<Category> = None;
    let mut info_name: Option<String> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = element_name(&e);

                if path.is_empty() {
                    if name != "root" {
                        return Err(ParseError::MalformedXml(format!("unexpected root element <{}>", name)));
                    }
                    saw_root = true;
                }

                // root > information > category > info
                match (path.len(), name.as_str()) {
                    (2, "category") if path[1] == "information" => {
                        category = Some(Category {
                            name: attribute(&e, "name")?.unwrap_or_default(),
                            infos: HashMap::new(),
                        });
                    }
                    (3, "info") if category.is_some() => {
                        info_name = attribute(&e, "name")?;
                    }
                    _ => {}
                }

                path.push(name);
                current_text.clear();
            }
            Ok(Event::Empty(e)) => {
                let name = element_name(&e);
                match path.len() {
                    0 if name == "root" => saw_root = true,
                    0 => {
                        return Err(ParseError::MalformedXml(format!("unexpected root element <{}>", name)));
                    }
                    1 => {
                        raw.fields.insert(name, String::new());
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| xml_error(&reader, err))?;
                current_text.push_str(&text);
            }
            Ok(Event::CData(e)) => {
                current_text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(_)) => {
                let name = path.pop().unwrap_or_default();
                let value = current_text.trim().to_string();

                match (path.len(), name.as_str()) {
                    (1, "information") => {}
                    (1, _) => {
                        raw.fields.insert(name, value);
                    }
                    (2, "category") => {
                        if let Some(done) = category.take() {
                            raw.categories.push(done);
                        }
                    }
                    (3, "info") => {
                        if let (Some(key), Some(cat)) = (info_name.take(), category.as_mut()) {
                            cat.infos.insert(key, value);
                        }
                    }
                    _ => {}
                }

                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(&reader, e)),
            _ => {}
        }
    }

    if !saw_root {
        return Err(ParseError::MalformedXml("missing <root> element".to_string()));
    }
    if !path.is_empty() {
        return Err(ParseError::MalformedXml(format!("unexpected end of document inside <{}>", path.join("><"))));
    }

    Ok(raw)
}

fn parse_flag(value: Option<&String>) -> bool {
    matches!(value.map(|v| v.trim()), Some("true") | Some("1"))
}

/// Lenient seconds: missing or unreadable values become 0
fn parse_seconds(value: Option<&String>) -> u64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.round() as u64)
        .unwrap_or(0)
}

/// Trailing number of a category name like "Stream 1"
fn stream_index(name: &str) -> Option<&str> {
    let digits = name.trim_end().rsplit(' ').next()?;
    (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())).then_some(digits)
}

fn audio_streams(categories: &[Category]) -> Vec<Device> {
    categories
        .iter()
        .enumerate()
        .filter(|(_, cat)| {
            cat.infos
                .get("Type")
                .map(|t| t.eq_ignore_ascii_case("audio"))
                .unwrap_or(false)
        })
        .map(|(idx, cat)| {
            let id = stream_index(&cat.name).map(str::to_string).unwrap_or_else(|| idx.to_string());
            let name = match cat.infos.get("Language").filter(|l| !l.is_empty()) {
                Some(lang) => format!("{} ({})", cat.name, lang),
                None => cat.name.clone(),
            };
            Device { id, name, is_active: false }
        })
        .collect()
}

/// Parse a `status.xml` document
///
/// `state` and `volume` are required. Everything else defaults when absent,
/// and unknown elements are ignored.
pub fn parse_status(body: &[u8]) -> Result<Status, ParseError> {
    let raw = read_raw_status(document_text(body)?)?;
    let fields = &raw.fields;

    let state = match fields.get("state").map(|s| s.as_str()) {
        None => return Err(ParseError::MissingField("state")),
        Some("playing") => PlaybackState::Playing,
        Some("paused") => PlaybackState::Paused,
        Some(_) => PlaybackState::Stopped,
    };

    let volume_text = fields.get("volume").ok_or(ParseError::MissingField("volume"))?;
    let volume = volume_text
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u32)
        .ok_or_else(|| ParseError::InvalidField {
            field: "volume",
            value: volume_text.clone(),
        })?;

    let length = parse_seconds(fields.get("length"));
    let position = fields
        .get("position")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
        .unwrap_or(0.0);

    let current_id = fields
        .get("currentplid")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(-1);

    let meta = raw.categories.iter().find(|c| c.name == META_CATEGORY);
    let title = meta.and_then(|m| m.infos.get("title").or_else(|| m.infos.get("filename")));

    let current_track = if current_id >= 0 || title.is_some() {
        Some(Track {
            id: if current_id >= 0 { current_id.to_string() } else { String::new() },
            name: title.cloned().unwrap_or_else(|| "Unknown".to_string()),
            artist: meta.and_then(|m| m.infos.get("artist")).cloned(),
            duration: length,
            uri: None,
        })
    } else {
        None
    };

    Ok(Status {
        state,
        volume,
        is_muted: volume == 0,
        repeat: parse_flag(fields.get("repeat")),
        loop_all: parse_flag(fields.get("loop")),
        random: parse_flag(fields.get("random")),
        current_track,
        time: parse_seconds(fields.get("time")),
        length,
        position,
        devices: audio_streams(&raw.categories),
    })
}

fn leaf_track(e: &BytesStart) -> Result<Track, ParseError> {
    let duration = attribute(e, "duration")?
        .and_then(|d| d.trim().parse::<i64>().ok())
        .filter(|d| *d > 0)
        .unwrap_or(0) as u64;

    Ok(Track {
        id: attribute(e, "id")?.ok_or(ParseError::MissingField("id"))?,
        name: attribute(e, "name")?.unwrap_or_default(),
        artist: None,
        duration,
        uri: attribute(e, "uri")?,
    })
}

fn node_playlist(e: &BytesStart) -> Result<Playlist, ParseError> {
    Ok(Playlist {
        id: attribute(e, "id")?.ok_or(ParseError::MissingField("id"))?,
        name: attribute(e, "name")?.unwrap_or_default(),
        tracks: Vec::new(),
    })
}

/// Parse a `playlist.xml` document
///
/// Each child node of the root node is a playlist. Leaves below it, at any
/// depth, are its tracks in document order.
pub fn parse_playlist(body: &[u8]) -> Result<Vec<Playlist>, ParseError> {
    let text = document_text(body)?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut playlists = Vec::new();
    let mut current: Option<Playlist> = None;
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = element_name(&e);
                if depth == 0 {
                    if name != "node" {
                        return Err(ParseError::MalformedXml(format!("unexpected root element <{}>", name)));
                    }
                    saw_root = true;
                }
                depth += 1;

                match (depth, name.as_str()) {
                    (2, "node") => current = Some(node_playlist(&e)?),
                    (d, "leaf") if d > 2 => {
                        if let Some(playlist) = current.as_mut() {
                            playlist.tracks.push(leaf_track(&e)?);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = element_name(&e);
                match (depth, name.as_str()) {
                    (0, "node") => saw_root = true,
                    (0, _) => {
                        return Err(ParseError::MalformedXml(format!("unexpected root element <{}>", name)));
                    }
                    (1, "node") => playlists.push(node_playlist(&e)?),
                    (d, "leaf") if d >= 2 => {
                        if let Some(playlist) = current.as_mut() {
                            playlist.tracks.push(leaf_track(&e)?);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(_)) => {
                if depth == 2 {
                    if let Some(done) = current.take() {
                        playlists.push(done);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(&reader, e)),
            _ => {}
        }
    }

    if !saw_root {
        return Err(ParseError::MalformedXml("missing root <node> element".to_string()));
    }
    if depth != 0 {
        return Err(ParseError::MalformedXml("unexpected end of document".to_string()));
    }

    Ok(playlists)
}
