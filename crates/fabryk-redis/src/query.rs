//! Similarity search request and `FT.SEARCH` compilation.
//!
//! Two query shapes, chosen by the score threshold:
//!
//! ```text
//! KNN    (<prefilter|*>)=>[KNN <limit> @<vector_key> $vector AS <alias>]
//! range  [(<prefilter>) ]@<vector_key>:[VECTOR_RANGE $distance_threshold $vector]
//!            =>{$yield_distance_as: <alias>}
//! ```
//!
//! Both are followed by `[RETURN ..] SORTBY .. DIALECT 2 LIMIT .. PARAMS ..`.

use std::fmt;

use crate::codec::VectorData;
use crate::command::Command;
use crate::error::{Error, Result};

/// Default reserved vector field.
pub const DEFAULT_VECTOR_KEY: &str = "content_vector";

/// Default alias for the computed distance.
pub const DEFAULT_DISTANCE_ALIAS: &str = "distance";

const VECTOR_PARAM: &str = "vector";
const THRESHOLD_PARAM: &str = "distance_threshold";

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("ASC"),
            Self::Desc => f.write_str("DESC"),
        }
    }
}

/// `SORTBY` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortBy {
    /// Field to sort on.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

impl SortBy {
    /// Sort ascending on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Sort descending on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// A vector similarity search against one index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    index: String,
    vector: VectorData,
    score_threshold: Option<f32>,
    pre_filter: Option<String>,
    returns: Vec<String>,
    sort_by: Option<SortBy>,
    offset: usize,
    limit: usize,
    vector_key: String,
    distance_alias: String,
}

impl SearchRequest {
    /// Create a KNN request for the top 1 result.
    pub fn new(index: impl Into<String>, vector: impl Into<VectorData>) -> Self {
        Self {
            index: index.into(),
            vector: vector.into(),
            score_threshold: None,
            pre_filter: None,
            returns: Vec::new(),
            sort_by: None,
            offset: 0,
            limit: 1,
            vector_key: DEFAULT_VECTOR_KEY.to_string(),
            distance_alias: DEFAULT_DISTANCE_ALIAS.to_string(),
        }
    }

    /// Switch to range mode when `0 < threshold < 1`; anything else is
    /// ignored and the request stays in KNN mode.
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        if threshold > 0.0 && threshold < 1.0 {
            self.score_threshold = Some(threshold);
        }
        self
    }

    /// Pre-filter query expression (e.g. `@job:{engineer}`); empty is ignored.
    pub fn with_pre_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        if !filter.is_empty() {
            self.pre_filter = Some(filter);
        }
        self
    }

    /// Fields to return. The distance alias is appended automatically.
    pub fn with_returns<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.returns = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Override the default `<alias> ASC` ordering.
    pub fn with_sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = Some(sort_by);
        self
    }

    /// Pagination; a limit of 0 becomes 1.
    pub fn with_offset_limit(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit.max(1);
        self
    }

    /// Vector field to search.
    pub fn with_vector_key(mut self, key: impl Into<String>) -> Self {
        self.vector_key = key.into();
        self
    }

    /// Name bound to the computed distance.
    pub fn with_distance_alias(mut self, alias: impl Into<String>) -> Self {
        self.distance_alias = alias.into();
        self
    }

    /// Index name.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Effective limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether the request runs as a range query.
    pub fn is_range(&self) -> bool {
        self.score_threshold.is_some()
    }

    /// Compile to an `FT.SEARCH` command.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyIndexName`] or [`Error::EmptyVector`].
    pub fn to_command(&self) -> Result<Command> {
        if self.index.is_empty() {
            return Err(Error::EmptyIndexName);
        }
        if self.vector.is_empty() {
            return Err(Error::EmptyVector);
        }

        let mut cmd = Command::new("FT.SEARCH").arg(self.index.as_str());
        let mut params: Vec<Vec<u8>> = vec![VECTOR_PARAM.into(), self.vector.to_bytes()];

        match self.score_threshold {
            Some(threshold) => {
                let range = format!(
                    "@{}:[VECTOR_RANGE ${THRESHOLD_PARAM} ${VECTOR_PARAM}]=>{{$yield_distance_as: {}}}",
                    self.vector_key, self.distance_alias
                );
                let query = match &self.pre_filter {
                    Some(filter) => format!("({filter}) {range}"),
                    None => range,
                };
                cmd.push_arg(query);
                params.push(THRESHOLD_PARAM.into());
                params.push(threshold.to_string().into_bytes());
            }
            None => {
                let filter = self.pre_filter.as_deref().unwrap_or("*");
                cmd.push_arg(format!(
                    "({filter})=>[KNN {} @{} ${VECTOR_PARAM} AS {}]",
                    self.limit, self.vector_key, self.distance_alias
                ));
            }
        }

        if !self.returns.is_empty() {
            cmd.push_arg("RETURN");
            cmd.push_arg((self.returns.len() + 1).to_string());
            cmd.extend_args(self.returns.iter().map(String::as_str));
            cmd.push_arg(self.distance_alias.as_str());
        }

        cmd.push_arg("SORTBY");
        match &self.sort_by {
            Some(sort) => {
                cmd.push_arg(sort.field.as_str());
                cmd.push_arg(sort.direction.to_string());
            }
            None => {
                cmd.push_arg(self.distance_alias.as_str());
                cmd.push_arg(SortDirection::Asc.to_string());
            }
        }

        cmd.extend_args(["DIALECT", "2"]);
        cmd.push_arg("LIMIT");
        cmd.push_arg(self.offset.to_string());
        cmd.push_arg(self.limit.to_string());

        cmd.push_arg("PARAMS");
        cmd.push_arg(params.len().to_string());
        cmd.extend_args(params);
        Ok(cmd)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn demo() -> SearchRequest {
        SearchRequest::new("demo", vec![0.111f32])
    }

    #[test]
    fn test_basic_knn() {
        assert_eq!(
            demo().to_command().unwrap().to_string(),
            "FT.SEARCH demo (*)=>[KNN 1 @content_vector $vector AS distance] \
             SORTBY distance ASC DIALECT 2 LIMIT 0 1 PARAMS 2 vector \\xf8S\\xe3="
        );
    }

    #[test]
    fn test_knn_with_limit() {
        assert_eq!(
            demo().with_offset_limit(0, 10).to_command().unwrap().to_string(),
            "FT.SEARCH demo (*)=>[KNN 10 @content_vector $vector AS distance] \
             SORTBY distance ASC DIALECT 2 LIMIT 0 10 PARAMS 2 vector \\xf8S\\xe3="
        );
    }

    #[test]
    fn test_range_with_threshold() {
        assert_eq!(
            demo().with_score_threshold(0.5).to_command().unwrap().to_string(),
            "FT.SEARCH demo @content_vector:[VECTOR_RANGE $distance_threshold $vector]\
             =>{$yield_distance_as: distance} SORTBY distance ASC DIALECT 2 LIMIT 0 1 \
             PARAMS 4 vector \\xf8S\\xe3= distance_threshold 0.5"
        );
    }

    #[test]
    fn test_knn_with_filter() {
        assert_eq!(
            demo()
                .with_pre_filter("@job{engineer}")
                .to_command()
                .unwrap()
                .to_string(),
            "FT.SEARCH demo (@job{engineer})=>[KNN 1 @content_vector $vector AS distance] \
             SORTBY distance ASC DIALECT 2 LIMIT 0 1 PARAMS 2 vector \\xf8S\\xe3="
        );
    }

    #[test]
    fn test_range_with_filter() {
        assert_eq!(
            demo()
                .with_score_threshold(0.5)
                .with_pre_filter("@job{engineer}")
                .to_command()
                .unwrap()
                .to_string(),
            "FT.SEARCH demo (@job{engineer}) @content_vector:[VECTOR_RANGE $distance_threshold $vector]\
             =>{$yield_distance_as: distance} SORTBY distance ASC DIALECT 2 LIMIT 0 1 \
             PARAMS 4 vector \\xf8S\\xe3= distance_threshold 0.5"
        );
    }

    #[test]
    fn test_threshold_boundaries_stay_knn() {
        for threshold in [0.0, 1.0, -0.1, 1.5] {
            let request = demo().with_score_threshold(threshold);
            assert!(!request.is_range(), "{threshold}");
            let tokens = request.to_command().unwrap().tokens();
            assert!(tokens[2].contains("KNN"));
            assert!(!tokens.contains(&THRESHOLD_PARAM.to_string()));
        }
    }

    #[test]
    fn test_returns_append_alias() {
        let tokens = demo()
            .with_returns(["content", "user"])
            .with_offset_limit(5, 3)
            .to_command()
            .unwrap()
            .tokens();
        assert_eq!(&tokens[3..8], ["RETURN", "3", "content", "user", "distance"]);
        let limit = tokens.iter().position(|t| t == "LIMIT").unwrap();
        assert_eq!(&tokens[limit..limit + 3], ["LIMIT", "5", "3"]);
    }

    #[test]
    fn test_custom_sort_and_keys() {
        let tokens = demo()
            .with_vector_key("embedding")
            .with_distance_alias("score")
            .with_sort_by(SortBy::desc("year"))
            .to_command()
            .unwrap()
            .tokens();
        assert_eq!(tokens[2], "(*)=>[KNN 1 @embedding $vector AS score]");
        assert_eq!(&tokens[3..6], ["SORTBY", "year", "DESC"]);
    }

    #[test]
    fn test_zero_limit_becomes_one() {
        let request = demo().with_offset_limit(0, 0);
        assert_eq!(request.limit(), 1);
    }

    #[test]
    fn test_f64_vector_param() {
        let cmd = SearchRequest::new("demo", vec![1.0f64]).to_command().unwrap();
        let args = cmd.args();
        assert_eq!(args[args.len() - 1], 1.0f64.to_le_bytes().to_vec());
    }

    #[test]
    fn test_params_count_matches_pairs() {
        for request in [demo(), demo().with_score_threshold(0.3)] {
            let tokens = request.to_command().unwrap().tokens();
            let at = tokens.iter().position(|t| t == "PARAMS").unwrap();
            let count: usize = tokens[at + 1].parse().unwrap();
            assert_eq!(count, tokens.len() - at - 2);
        }
    }

    #[test]
    fn test_invalid_requests() {
        assert!(matches!(
            SearchRequest::new("", vec![0.1f32]).to_command(),
            Err(Error::EmptyIndexName)
        ));
        assert!(matches!(
            SearchRequest::new("demo", Vec::<f32>::new()).to_command(),
            Err(Error::EmptyVector)
        ));
    }
}
