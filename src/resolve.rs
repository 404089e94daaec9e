use crate::types::{CsvRecord, MissingField, TrackPair};

/// Header names accepted for the artist column, in lookup order.
pub const ARTIST_COLUMNS: [&str; 2] = ["artist", "Artist"];

/// Header names accepted for the track column, in lookup order.
pub const TRACK_COLUMNS: [&str; 4] = ["track", "Track", "title", "Title"];

/// Turn a CSV record into an artist/track pair.
///
/// Header-mode records are looked up by column name (see [`ARTIST_COLUMNS`]
/// and [`TRACK_COLUMNS`], first non-empty match wins); positional records use
/// the first two columns. Empty values count as missing. The artist is checked
/// first.
pub fn resolve(record: &CsvRecord) -> Result<TrackPair, MissingField> {
    let (artist, track) = match record {
        CsvRecord::Named(_) => (
            first_present(record, &ARTIST_COLUMNS),
            first_present(record, &TRACK_COLUMNS),
        ),
        CsvRecord::Positional(_) => (record.column(0), record.column(1)),
    };

    let artist = non_empty(artist).ok_or(MissingField::Artist)?;
    let track = non_empty(track).ok_or(MissingField::Track)?;

    Ok(TrackPair::new(artist, track))
}

fn first_present<'a>(record: &'a CsvRecord, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| record.field(name).filter(|v| !v.is_empty()))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
