use crate::store::Record;

/// Records whose `display_field` contains `query`, ignoring case.
///
/// Order is preserved and an empty query keeps everything.
pub fn filter<'a>(records: &'a [Record], display_field: &str, query: &str) -> Vec<&'a Record> {
  if query.is_empty() {
    return records.iter().collect();
  }

  let query_lower = query.to_lowercase();
  records
    .iter()
    .filter(|record| {
      record
        .value(display_field)
        .to_lowercase()
        .contains(&query_lower)
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  const NAME: &str = "CUSTOMER NAME";

  fn record(name: &str, id: &str) -> Record {
    [("CUSTOMER NAME", name), ("OA NUMBER", id)]
      .into_iter()
      .collect()
  }

  fn sample() -> Vec<Record> {
    vec![
      record("Acme", "101"),
      record("Zeta", "202"),
      record("Acme Boilers", "303"),
      record("BACKSTOP Ltd", "404"),
    ]
  }

  #[test]
  fn test_query_matches_case_insensitively() {
    let records = vec![record("Acme", "101"), record("Zeta", "202")];
    let filtered = filter(&records, NAME, "ac");
    assert_eq!(filtered, vec![&record("Acme", "101")]);
  }

  #[test]
  fn test_empty_query_returns_everything() {
    let records = sample();
    let filtered: Vec<Record> = filter(&records, NAME, "").into_iter().cloned().collect();
    assert_eq!(filtered, records);
  }

  #[test]
  fn test_order_is_preserved() {
    let records = sample();
    let ids: Vec<&str> = filter(&records, NAME, "AC")
      .into_iter()
      .map(|r| r.value("OA NUMBER"))
      .collect();
    assert_eq!(ids, vec!["101", "303", "404"]);
  }

  #[test]
  fn test_every_result_matches_and_is_a_subsequence() {
    let records = sample();
    for query in ["a", "ME", "zeta", "ltd", "xyz", " "] {
      let filtered = filter(&records, NAME, query);

      for r in &filtered {
        assert!(r
          .value(NAME)
          .to_lowercase()
          .contains(&query.to_lowercase()));
      }

      // Subsequence: positions in the source are strictly increasing
      let positions: Vec<usize> = filtered
        .iter()
        .map(|r| records.iter().position(|s| std::ptr::eq(s, *r)).unwrap())
        .collect();
      assert!(positions.windows(2).all(|w| w[0] < w[1]), "query {query:?}");
    }
  }

  #[test]
  fn test_no_match() {
    assert!(filter(&sample(), NAME, "nobody").is_empty());
  }

  #[test]
  fn test_records_without_display_field_never_match() {
    let records: Vec<Record> = vec![[("OA NUMBER", "101")].into_iter().collect()];
    assert!(filter(&records, NAME, "1").is_empty());
  }

  #[test]
  fn test_source_is_untouched() {
    let records = sample();
    let before = records.clone();
    let _ = filter(&records, NAME, "acme");
    assert_eq!(records, before);
  }
}
