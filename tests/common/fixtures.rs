use log_exporter::types::{QueryResults, QueryStatistics, QueryStatus, ResultField};

pub fn record(pairs: &[(&str, &str)]) -> Vec<ResultField> {
    pairs.iter().map(|(k, v)| ResultField::new(*k, *v)).collect()
}

pub fn pending(status: QueryStatus) -> QueryResults {
    QueryResults {
        status,
        statistics: None,
        records: vec![],
    }
}

pub fn complete(records: Vec<Vec<ResultField>>, scanned: f64, matched: f64) -> QueryResults {
    QueryResults {
        status: QueryStatus::Complete,
        statistics: Some(QueryStatistics {
            records_scanned: scanned,
            records_matched: matched,
            bytes_scanned: scanned * 100.0,
        }),
        records,
    }
}

pub fn finished(status: QueryStatus) -> QueryResults {
    QueryResults {
        status,
        statistics: Some(QueryStatistics::default()),
        records: vec![],
    }
}
