//! Store type name parser
//!
//! Splits store type strings from model configuration into a base name and
//! its numeric facets:
//! - `text` -> base `text`
//! - `varchar(256)` -> base `varchar`, size 256
//! - `decimal(18, 2)` -> base `decimal`, size 18, scale 2
//! - `double precision` -> base `double precision`

use nom::{
    bytes::complete::take_while1,
    character::complete::{char, digit1, multispace0},
    combinator::{map_res, opt},
    multi::separated_list1,
    sequence::delimited,
    IResult, Parser,
};

use super::errors::TypeMappingError;

/// Parsed store type: lowercase base name plus optional size/scale facets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTypeName {
    pub base: String,
    pub size: Option<u32>,
    pub scale: Option<u32>,
}

fn base_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == ' ').parse(input)
}

fn facet(input: &str) -> IResult<&str, u32> {
    delimited(
        multispace0,
        map_res(digit1, |digits: &str| digits.parse::<u32>()),
        multispace0,
    )
    .parse(input)
}

fn facets(input: &str) -> IResult<&str, Vec<u32>> {
    delimited(char('('), separated_list1(char(','), facet), char(')')).parse(input)
}

fn store_type(input: &str) -> IResult<&str, (&str, Option<Vec<u32>>)> {
    let (input, (_, base, facets, _)) =
        (multispace0, base_name, opt(facets), multispace0).parse(input)?;
    Ok((input, (base, facets)))
}

/// Parse a store type string such as `nvarchar(256)`.
pub fn parse_store_type(raw: &str) -> Result<StoreTypeName, TypeMappingError> {
    let invalid = |reason: String| TypeMappingError::InvalidStoreType {
        store_type: raw.to_string(),
        reason,
    };

    let (rest, (base, facets)) = store_type(raw).map_err(|e| invalid(e.to_string()))?;
    if !rest.is_empty() {
        return Err(invalid(format!("unexpected trailing input '{}'", rest)));
    }

    let base = base.trim().to_lowercase();
    if base.is_empty() {
        return Err(invalid("empty type name".to_string()));
    }

    let facets = facets.unwrap_or_default();
    if facets.len() > 2 {
        return Err(invalid(format!(
            "expected at most 2 facets, found {}",
            facets.len()
        )));
    }

    Ok(StoreTypeName {
        base,
        size: facets.first().copied(),
        scale: facets.get(1).copied(),
    })
}
