//! Grouped aggregation of replicate tables.
//!
//! Records from every input table are pooled, grouped by the key columns
//! and reduced to one [`GroupSummary`] per distinct key.

use super::stats;
use crate::error::AggregateError;
use crate::models::{
    ColumnKind, GroupKey, GroupSummary, KeyValue, SingletonPolicy, SummaryTable,
};
use crate::table::Table;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Which columns to group by and summarize.
#[derive(Debug, Clone)]
pub struct AggregateSpec {
    /// Key columns, in output order. May be empty.
    pub group_by: Vec<String>,
    /// Numeric column to summarize.
    pub target: String,
    /// Handling of groups with fewer than two members.
    pub singleton: SingletonPolicy,
}

impl Default for AggregateSpec {
    fn default() -> Self {
        Self {
            group_by: vec!["N", "p", "recrate"]
                .into_iter()
                .map(String::from)
                .collect(),
            target: "div".to_string(),
            singleton: SingletonPolicy::Nan,
        }
    }
}

impl From<&crate::config::AggregateConfig> for AggregateSpec {
    fn from(config: &crate::config::AggregateConfig) -> Self {
        Self {
            group_by: config.group_by.clone(),
            target: config.target.clone(),
            singleton: config.singleton,
        }
    }
}

impl AggregateSpec {
    /// Reject column selections that cannot describe a grouping.
    pub fn validate(&self) -> Result<(), AggregateError> {
        if self.target.is_empty() {
            return Err(AggregateError::InvalidColumns(
                "target column name is empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for column in &self.group_by {
            if column.is_empty() {
                return Err(AggregateError::InvalidColumns(
                    "grouping column name is empty".to_string(),
                ));
            }
            if !seen.insert(column.as_str()) {
                return Err(AggregateError::InvalidColumns(format!(
                    "'{}' is listed twice in the grouping columns",
                    column
                )));
            }
        }

        if seen.contains(self.target.as_str()) {
            return Err(AggregateError::InvalidColumns(format!(
                "'{}' cannot be both a grouping column and the target",
                self.target
            )));
        }

        Ok(())
    }
}

/// Column positions of one table.
struct Layout {
    keys: Vec<usize>,
    target: usize,
}

/// Groups records and computes per-group summaries.
pub struct Aggregator {
    spec: AggregateSpec,
}

impl Aggregator {
    pub fn new(spec: AggregateSpec) -> Result<Self, AggregateError> {
        spec.validate()?;
        Ok(Self { spec })
    }

    /// Aggregate all tables into one summary table.
    ///
    /// Aborts on the first schema, parse or (under the `error` policy)
    /// insufficient-data failure; no partial table is returned.
    pub fn aggregate(&self, tables: &[Table]) -> Result<SummaryTable, AggregateError> {
        let (grouped, records) = self.group(tables)?;
        debug!("{} records in {} groups", records, grouped.len());

        let mut groups = Vec::with_capacity(grouped.len());
        for (key, values) in grouped {
            groups.push(self.summarize(key, &values)?);
        }

        Ok(SummaryTable {
            group_by: self.spec.group_by.clone(),
            target: self.spec.target.clone(),
            singleton: self.spec.singleton,
            sources: tables.iter().map(|t| t.source.clone()).collect(),
            records,
            groups,
        })
    }

    /// Single pass over every record, keeping every target value.
    ///
    /// Key column kinds are inferred over all tables first, so a column is
    /// typed as a whole rather than cell by cell.
    fn group(
        &self,
        tables: &[Table],
    ) -> Result<(BTreeMap<GroupKey, Vec<f64>>, usize), AggregateError> {
        let layouts = tables
            .iter()
            .map(|table| self.resolve(table))
            .collect::<Result<Vec<_>, _>>()?;
        let kinds = self.key_kinds(tables, &layouts);

        let mut grouped: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
        let mut records = 0;

        for (table, layout) in tables.iter().zip(&layouts) {
            for row in &table.rows {
                let key = GroupKey(
                    layout
                        .keys
                        .iter()
                        .zip(&kinds)
                        .map(|(&i, &kind)| KeyValue::parse_as(&row.fields[i], kind))
                        .collect(),
                );

                let cell = &row.fields[layout.target];
                let value = match cell.parse::<f64>() {
                    Ok(v) if v.is_finite() => v,
                    _ => {
                        return Err(AggregateError::Parse {
                            input: table.source.clone(),
                            line: row.line,
                            column: self.spec.target.clone(),
                            value: cell.clone(),
                        })
                    }
                };

                grouped.entry(key).or_default().push(value);
                records += 1;
            }
        }

        Ok((grouped, records))
    }

    /// Widest kind of each key column across every table.
    fn key_kinds(&self, tables: &[Table], layouts: &[Layout]) -> Vec<ColumnKind> {
        let mut kinds = vec![ColumnKind::default(); self.spec.group_by.len()];
        for (table, layout) in tables.iter().zip(layouts) {
            for row in &table.rows {
                for (kind, &i) in kinds.iter_mut().zip(&layout.keys) {
                    *kind = kind.widen(&row.fields[i]);
                }
            }
        }
        for (column, kind) in self.spec.group_by.iter().zip(&kinds) {
            debug!("Key column '{}' typed as {:?}", column, kind);
        }
        kinds
    }

    /// Map the required columns to positions in this table's header.
    fn resolve(&self, table: &Table) -> Result<Layout, AggregateError> {
        let mut missing = Vec::new();
        let mut keys = Vec::with_capacity(self.spec.group_by.len());

        for column in &self.spec.group_by {
            match table.column_index(column) {
                Some(i) => keys.push(i),
                None => missing.push(column.clone()),
            }
        }

        let target = table.column_index(&self.spec.target);
        if target.is_none() {
            missing.push(self.spec.target.clone());
        }

        match target {
            Some(target) if missing.is_empty() => Ok(Layout { keys, target }),
            _ => Err(AggregateError::Schema {
                input: table.source.clone(),
                missing,
                available: table.header.clone(),
            }),
        }
    }

    fn summarize(&self, key: GroupKey, values: &[f64]) -> Result<GroupSummary, AggregateError> {
        let mean = stats::mean(values);

        let variance = match stats::sample_variance(values, mean) {
            Some(v) => v,
            None => match self.spec.singleton {
                SingletonPolicy::Nan => {
                    warn!(
                        "Group {} has {} member(s); variance reported as NaN",
                        key.describe(&self.spec.group_by),
                        values.len()
                    );
                    f64::NAN
                }
                SingletonPolicy::Error => {
                    return Err(AggregateError::InsufficientData {
                        key: key.describe(&self.spec.group_by),
                        count: values.len(),
                    })
                }
            },
        };

        let cv = stats::coefficient_of_variation(variance.sqrt(), mean);

        Ok(GroupSummary {
            key,
            count: values.len(),
            mean,
            variance,
            cv,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::reader::read_table;
    use crate::table::Delimiter;

    const EPS: f64 = 1e-9;

    fn table(text: &str) -> Table {
        read_table("test", text.as_bytes(), Delimiter::Auto).unwrap()
    }

    fn aggregate(text: &str) -> Result<SummaryTable, AggregateError> {
        Aggregator::new(AggregateSpec::default())?.aggregate(&[table(text)])
    }

    fn key(n: i64, p: f64, recrate: i64) -> GroupKey {
        GroupKey(vec![
            KeyValue::Int(n),
            KeyValue::Float(p),
            KeyValue::Int(recrate),
        ])
    }

    #[test]
    fn test_two_replicates_one_group() {
        let summary = aggregate("N p recrate div\n500 0.1 0 0.002\n500 0.1 0 0.004\n").unwrap();

        assert_eq!(summary.groups.len(), 1);
        assert_eq!(summary.records, 2);
        let group = &summary.groups[0];
        assert_eq!(group.key, key(500, 0.1, 0));
        assert_eq!(group.count, 2);
        assert!((group.mean - 0.003).abs() < EPS);
        assert!((group.variance - 2e-6).abs() < EPS);
        assert!((group.cv - (2e-6f64).sqrt() / 0.003).abs() < EPS);
    }

    #[test]
    fn test_groups_differing_in_p() {
        let text = "N p recrate div\n\
                    500 0.0 0 0.002\n\
                    500 0.1 0 0.004\n\
                    500 0.0 0 0.006\n\
                    500 0.1 0 0.008\n";
        let summary = aggregate(text).unwrap();

        assert_eq!(summary.groups.len(), 2);
        let low = summary.get(&key(500, 0.0, 0)).unwrap();
        let high = summary.get(&key(500, 0.1, 0)).unwrap();
        assert!((low.mean - 0.004).abs() < EPS);
        assert!((high.mean - 0.006).abs() < EPS);
    }

    #[test]
    fn test_row_count_matches_distinct_keys() {
        let text = "N p recrate div\n\
                    100 0.1 0 1\n\
                    200 0.1 0 1\n\
                    100 0.1 0 2\n\
                    100 0.1 1e-8 3\n\
                    200 0.5 0 4\n\
                    100 0.1 1e-8 5\n";
        let summary = aggregate(text).unwrap();
        assert_eq!(summary.groups.len(), 4);
        let total: usize = summary.groups.iter().map(|g| g.count).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_key_columns_are_typed_as_a_whole() {
        let text = "N p recrate div\n\
                    500 0 0 1\n\
                    500 0.0 0 3\n\
                    500 0.5 0 5\n";
        let summary = aggregate(text).unwrap();

        assert_eq!(summary.groups.len(), 2);
        let zero = summary.get(&key(500, 0.0, 0)).unwrap();
        assert_eq!(zero.count, 2);
        assert!((zero.mean - 2.0).abs() < EPS);
    }

    #[test]
    fn test_key_column_typed_across_tables() {
        let first = table("N p recrate div\n500 0 0 1\n");
        let second = table("N p recrate div\n500 0.0 0 3\n");
        let summary = Aggregator::new(AggregateSpec::default())
            .unwrap()
            .aggregate(&[first, second])
            .unwrap();

        assert_eq!(summary.groups.len(), 1);
        assert_eq!(summary.groups[0].key, key(500, 0.0, 0));
        assert_eq!(summary.groups[0].count, 2);
    }

    #[test]
    fn test_groups_sorted_by_key() {
        let text = "N p recrate div\n\
                    1000 0.1 0 1\n\
                    500 0.5 0 1\n\
                    500 0.1 0 1\n";
        let summary = aggregate(text).unwrap();
        let keys: Vec<GroupKey> = summary.groups.iter().map(|g| g.key.clone()).collect();
        assert_eq!(
            keys,
            vec![key(500, 0.1, 0), key(500, 0.5, 0), key(1000, 0.1, 0)]
        );
    }

    #[test]
    fn test_singleton_group_reports_nan() {
        let summary = aggregate("N p recrate div\n500 0.1 0 0.002\n").unwrap();
        let group = &summary.groups[0];
        assert_eq!(group.count, 1);
        assert_eq!(group.mean, 0.002);
        assert!(group.variance.is_nan());
        assert!(group.cv.is_nan());
    }

    #[test]
    fn test_singleton_group_error_policy() {
        let spec = AggregateSpec {
            singleton: SingletonPolicy::Error,
            ..AggregateSpec::default()
        };
        let text = "N p recrate div\n500 0.1 0 0.002\n500 0.1 0 0.004\n100 0.1 0 0.5\n";
        let err = Aggregator::new(spec)
            .unwrap()
            .aggregate(&[table(text)])
            .unwrap_err();

        match err {
            AggregateError::InsufficientData { key, count } => {
                assert_eq!(key, "(N=100, p=0.1, recrate=0)");
                assert_eq!(count, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_mean_cv_is_nan() {
        let summary = aggregate("N p recrate div\n500 0.1 0 0\n500 0.1 0 0\n").unwrap();
        let group = &summary.groups[0];
        assert_eq!(group.mean, 0.0);
        assert_eq!(group.variance, 0.0);
        assert!(group.cv.is_nan());
    }

    #[test]
    fn test_non_numeric_target_is_a_parse_error() {
        let err = aggregate("N p recrate div\n500 0.1 0 0.002\n500 0.1 0 NA\n").unwrap_err();
        match err {
            AggregateError::Parse {
                line,
                column,
                value,
                ..
            } => {
                assert_eq!(line, 3);
                assert_eq!(column, "div");
                assert_eq!(value, "NA");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_finite_target_is_a_parse_error() {
        let err = aggregate("N p recrate div\n500 0.1 0 inf\n").unwrap_err();
        assert!(matches!(err, AggregateError::Parse { .. }));
    }

    #[test]
    fn test_missing_columns_are_a_schema_error() {
        let err = aggregate("N recrate value\n500 0 0.1\n").unwrap_err();
        match err {
            AggregateError::Schema {
                missing, available, ..
            } => {
                assert_eq!(missing, vec!["p", "div"]);
                assert_eq!(available, vec!["N", "recrate", "value"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_columns_matched_by_name() {
        let first = table("N p recrate div\n500 0.1 0 0.002\n");
        let second = table("div,recrate,p,N\n0.004,0,0.1,500\n");
        let summary = Aggregator::new(AggregateSpec::default())
            .unwrap()
            .aggregate(&[first, second])
            .unwrap();

        assert_eq!(summary.groups.len(), 1);
        assert_eq!(summary.groups[0].count, 2);
        assert_eq!(summary.sources.len(), 2);
    }

    #[test]
    fn test_no_grouping_columns() {
        let spec = AggregateSpec {
            group_by: Vec::new(),
            ..AggregateSpec::default()
        };
        let summary = Aggregator::new(spec)
            .unwrap()
            .aggregate(&[table("div\n1.0\n2.0\n3.0\n")])
            .unwrap();

        assert_eq!(summary.groups.len(), 1);
        assert_eq!(summary.groups[0].key, GroupKey(Vec::new()));
        assert!((summary.groups[0].mean - 2.0).abs() < EPS);
        assert!((summary.groups[0].variance - 1.0).abs() < EPS);
    }

    #[test]
    fn test_empty_table_has_no_groups() {
        let summary = aggregate("N p recrate div\n").unwrap();
        assert!(summary.groups.is_empty());
        assert_eq!(summary.records, 0);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let text = "N p recrate div\n500 0.1 0 0.002\n100 0.5 0 0.7\n500 0.1 0 0.004\n";
        let first = aggregate(text).unwrap();
        let second = aggregate(text).unwrap();

        assert_eq!(first.groups.len(), second.groups.len());
        for (a, b) in first.groups.iter().zip(&second.groups) {
            assert_eq!(a.key, b.key);
            assert_eq!(a.count, b.count);
            assert_eq!(a.mean.to_bits(), b.mean.to_bits());
            assert_eq!(a.variance.to_bits(), b.variance.to_bits());
        }
    }

    #[test]
    fn test_spec_validation() {
        let duplicate = AggregateSpec {
            group_by: vec!["N".to_string(), "N".to_string()],
            ..AggregateSpec::default()
        };
        assert!(Aggregator::new(duplicate).is_err());

        let overlapping = AggregateSpec {
            group_by: vec!["div".to_string()],
            ..AggregateSpec::default()
        };
        assert!(Aggregator::new(overlapping).is_err());

        let empty_target = AggregateSpec {
            target: String::new(),
            ..AggregateSpec::default()
        };
        assert!(Aggregator::new(empty_target).is_err());
    }
}
