use std::collections::HashSet;

use thiserror::Error;

use crate::{
    catalog::Filter,
    model::{
        decision::{Decision, SwipeAction},
        stats::SessionStats,
    },
};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Persisted payload is incomplete")]
    Incomplete,
    #[error("Reading persisted records failed")]
    MalformedRecords(#[from] csv::Error),
    #[error("Writing persisted records failed")]
    WriteFailed,
}

pub fn encode_id_set(ids: &HashSet<String>) -> Result<Vec<u8>, CodecError> {
    let mut sorted: Vec<&String> = ids.iter().collect();
    sorted.sort();

    let mut writer = csv::Writer::from_writer(Vec::new());
    for id in sorted {
        writer.write_record([id.as_str()])?;
    }

    writer.into_inner().map_err(|_| CodecError::WriteFailed)
}

pub fn decode_id_set(content: &[u8]) -> Result<HashSet<String>, CodecError> {
    let mut ids = HashSet::new();
    for result in reader(content).records() {
        let record = result?;
        if let Some(id) = record.get(0) {
            ids.insert(id.to_owned());
        }
    }

    Ok(ids)
}

pub fn encode_actions(actions: &[SwipeAction]) -> Result<Vec<u8>, CodecError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for action in actions {
        writer.write_record([
            action.id.to_string().as_str(),
            action.item_id.as_str(),
            action.decision.as_str(),
            action.recorded_at.to_string().as_str(),
        ])?;
    }

    writer.into_inner().map_err(|_| CodecError::WriteFailed)
}

pub fn decode_actions(content: &[u8]) -> Result<Vec<SwipeAction>, CodecError> {
    let mut actions = Vec::new();
    for result in reader(content).records() {
        let record = result?;

        // Unreadable entries are skipped, the rest of the log stays usable.
        let id = match record.get(0).and_then(|id| id.parse().ok()) {
            Some(id) => id,
            None => continue,
        };

        let item_id = match record.get(1) {
            Some(item_id) => item_id.to_owned(),
            None => continue,
        };

        let decision = match record.get(2).and_then(Decision::parse) {
            Some(decision) => decision,
            None => continue,
        };

        let recorded_at = match record.get(3).and_then(|at| at.parse().ok()) {
            Some(recorded_at) => recorded_at,
            None => continue,
        };

        actions.push(SwipeAction {
            id,
            item_id,
            decision,
            recorded_at,
        });
    }

    Ok(actions)
}

pub fn encode_stats(stats: &SessionStats) -> Result<Vec<u8>, CodecError> {
    let ended_at = stats
        .ended_at
        .map(|ended| ended.to_string())
        .unwrap_or_default();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        stats.items_reviewed.to_string().as_str(),
        stats.items_deleted.to_string().as_str(),
        stats.bytes_freed.to_string().as_str(),
        stats.started_at.to_string().as_str(),
        ended_at.as_str(),
    ])?;

    writer.into_inner().map_err(|_| CodecError::WriteFailed)
}

pub fn decode_stats(content: &[u8]) -> Result<SessionStats, CodecError> {
    let mut records = reader(content).into_records();
    let record = records.next().ok_or(CodecError::Incomplete)??;

    let field = |index: usize| record.get(index).ok_or(CodecError::Incomplete);

    Ok(SessionStats {
        items_reviewed: field(0)?.parse().map_err(|_| CodecError::Incomplete)?,
        items_deleted: field(1)?.parse().map_err(|_| CodecError::Incomplete)?,
        bytes_freed: field(2)?.parse().map_err(|_| CodecError::Incomplete)?,
        started_at: field(3)?.parse().map_err(|_| CodecError::Incomplete)?,
        ended_at: match field(4)? {
            "" => None,
            ended => Some(ended.parse().map_err(|_| CodecError::Incomplete)?),
        },
    })
}

pub fn encode_filter(filter: Filter, year: Option<i32>) -> Result<Vec<u8>, CodecError> {
    let year = year.map(|year| year.to_string()).unwrap_or_default();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([filter.as_str(), year.as_str()])?;

    writer.into_inner().map_err(|_| CodecError::WriteFailed)
}

pub fn decode_filter(content: &[u8]) -> Result<(Filter, Option<i32>), CodecError> {
    let mut records = reader(content).into_records();
    let record = records.next().ok_or(CodecError::Incomplete)??;

    let filter = record
        .get(0)
        .and_then(Filter::parse)
        .ok_or(CodecError::Incomplete)?;

    let year = match record.get(1).unwrap_or_default() {
        "" => None,
        year => Some(year.parse().map_err(|_| CodecError::Incomplete)?),
    };

    Ok((filter, year))
}

fn reader(content: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn id_set_round_trips() {
        let ids: HashSet<String> = ["a", "b", "c with, comma"]
            .into_iter()
            .map(str::to_owned)
            .collect();

        let encoded = encode_id_set(&ids).expect("encode");
        let decoded = decode_id_set(&encoded).expect("decode");

        assert_eq!(ids, decoded);
    }

    #[test]
    fn empty_id_set_round_trips() {
        let encoded = encode_id_set(&HashSet::new()).expect("encode");
        let decoded = decode_id_set(&encoded).expect("decode");

        assert!(decoded.is_empty());
    }

    #[test]
    fn actions_round_trip_in_order() {
        let actions = vec![
            SwipeAction {
                id: 1,
                item_id: "first".to_owned(),
                decision: Decision::Keep,
                recorded_at: 1_000,
            },
            SwipeAction {
                id: 2,
                item_id: "second".to_owned(),
                decision: Decision::Maybe,
                recorded_at: 2_000,
            },
        ];

        let encoded = encode_actions(&actions).expect("encode");
        let decoded = decode_actions(&encoded).expect("decode");

        assert_eq!(actions, decoded);
    }

    #[test]
    fn unreadable_action_records_are_skipped() {
        let content = b"1,kept-item,keep,100\nnot-a-number,x,keep,100\n2,second,bogus,100\n";

        let decoded = decode_actions(content).expect("decode");

        assert_eq!(1, decoded.len());
        assert_eq!("kept-item", decoded[0].item_id);
    }

    #[test]
    fn stats_round_trip_with_and_without_end() {
        let mut stats = SessionStats {
            items_reviewed: 12,
            items_deleted: 3,
            bytes_freed: 9_000_000,
            started_at: 1_700_000_000,
            ended_at: None,
        };

        let decoded = decode_stats(&encode_stats(&stats).expect("encode")).expect("decode");
        assert_eq!(stats, decoded);

        stats.ended_at = Some(1_700_000_100);
        let decoded = decode_stats(&encode_stats(&stats).expect("encode")).expect("decode");
        assert_eq!(stats, decoded);
    }

    #[test]
    fn filter_round_trips() {
        for (filter, year) in [
            (Filter::All, None),
            (Filter::LargestFirst, Some(2021)),
            (Filter::MaybePile, None),
        ] {
            let encoded = encode_filter(filter, year).expect("encode");
            assert_eq!((filter, year), decode_filter(&encoded).expect("decode"));
        }
    }

    #[test]
    fn garbage_stats_fail_to_decode() {
        assert!(decode_stats(b"").is_err());
        assert!(decode_stats(b"a,b,c,d,e\n").is_err());
    }
}
