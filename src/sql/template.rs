//! Master query template
//!
//! Every generated query has the same skeleton:
//!
//! 1. temporary function definitions
//! 2. `numbered_duplicates` / `deduplicated`: keep the earliest-arriving row
//!    per (client, date, document)
//! 3. optional reshaping CTEs (keyed metrics flatten to one row per key)
//! 4. `windowed`: per-client aggregates over a framed window
//! 5. the final projection
//!
//! Deduplication is part of the skeleton itself and cannot be left out by
//! a generator; the variable parts are passed in as [`TemplateSlots`].

use super::fragments::{indent_lines, join_fragments};

/// Name of the deduplicated CTE every query reads from
pub const DEDUPLICATED: &str = "deduplicated";

/// Name of the windowed CTE the final projection reads from
pub const WINDOWED: &str = "windowed";

/// Source table and the columns used to spot retransmitted documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceClause {
    /// Table (possibly backquoted) rows are read from
    pub table: String,
    /// Columns identifying one submitted document
    pub dedup_partition: Vec<String>,
    /// Column giving arrival order within a duplicate group
    pub arrival_order: String,
    /// `WHERE` conditions, joined with `AND`
    pub filters: Vec<String>,
}

/// A named common table expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cte {
    pub name: String,
    pub body: String,
}

impl Cte {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

/// Variable parts of a query, filled per metric type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSlots {
    /// CTEs between deduplication and windowing; the windowed step reads
    /// from the last one, or from `deduplicated` when empty
    pub reshaping: Vec<Cte>,
    /// Dimension columns selected by the windowed step
    pub projection: Vec<String>,
    /// Aggregate select items, after the dimensions
    pub aggregates: Vec<String>,
    /// Window partition; keyed metrics add the metric name and key
    pub partition_by: Vec<String>,
    /// Window ordering column
    pub window_order: String,
    /// Final statement reading from `windowed`
    pub final_select: String,
}

impl TemplateSlots {
    /// Relation the windowed step reads from
    pub fn windowed_source(&self) -> &str {
        self.reshaping
            .last()
            .map(|cte| cte.name.as_str())
            .unwrap_or(DEDUPLICATED)
    }
}

/// Fixed skeleton of one generator's queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    /// Name written into the leading comment
    pub generated_by: String,
    /// Temporary function definitions, in dependency order
    pub functions: Vec<String>,
    pub source: SourceClause,
}

impl QueryTemplate {
    /// Render the full statement.
    pub fn render(&self, slots: &TemplateSlots) -> String {
        let functions = self.functions.join("\n\n");
        let dedup_partition = join_fragments(&self.source.dedup_partition, 10);
        let filters = self.source.filters.join("\n      AND ");

        let reshaping: String = slots
            .reshaping
            .iter()
            .map(|cte| format!("  {} AS (\n{}\n  ),\n\n", cte.name, indent_lines(&cte.body, 4)))
            .collect();

        let mut select_items = vec!["ROW_NUMBER() OVER w1_unframed AS _n".to_string()];
        select_items.extend(slots.projection.iter().cloned());
        select_items.extend(slots.aggregates.iter().cloned());
        let select_items = join_fragments(&select_items, 6);

        let partition_by = join_fragments(&slots.partition_by, 10);

        format!(
            "-- Query generated by: {generated_by}
{functions}

WITH
  -- normalize client_id and rank by document_id
  numbered_duplicates AS (
    SELECT
      ROW_NUMBER() OVER (
        PARTITION BY
          {dedup_partition}
        ORDER BY {arrival_order} ASC
      ) AS _n,
      * REPLACE(LOWER(client_id) AS client_id)
    FROM {table}
    WHERE {filters}
  ),

  -- Deduplicating on document_id is necessary to get valid SUM values.
  {DEDUPLICATED} AS (
    SELECT * EXCEPT (_n)
    FROM numbered_duplicates
    WHERE _n = 1
  ),

{reshaping}  -- Aggregate by client_id using windows
  {WINDOWED} AS (
    SELECT
      {select_items}
    FROM {windowed_source}
    WINDOW
      -- Aggregations require a framed window
      w1 AS (
        PARTITION BY
          {partition_by}
        ORDER BY {window_order} ASC
        ROWS BETWEEN UNBOUNDED PRECEDING AND UNBOUNDED FOLLOWING
      ),

      -- ROW_NUMBER does not work on a framed window
      w1_unframed AS (
        PARTITION BY
          {partition_by}
        ORDER BY {window_order} ASC
      )
  )
{final_select}
",
            generated_by = self.generated_by,
            arrival_order = self.source.arrival_order,
            table = self.source.table,
            windowed_source = slots.windowed_source(),
            window_order = slots.window_order,
            final_select = slots.final_select.trim_end(),
        )
    }
}
