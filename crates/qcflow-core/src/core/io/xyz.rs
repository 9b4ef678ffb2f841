use crate::core::io::traits::StructureFile;
use crate::core::models::structure::{Site, Structure};
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
    #[error("Header declares {expected} atom(s) but {found} were read")]
    AtomCountMismatch { expected: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum XyzParseErrorKind {
    #[error("Missing atom count header")]
    MissingHeader,
    #[error("Invalid atom count '{0}'")]
    InvalidCount(String),
    #[error("Expected 'symbol x y z' but found '{0}'")]
    MalformedAtomLine(String),
    #[error("Invalid coordinate '{0}'")]
    InvalidCoordinate(String),
    #[error("Invalid value '{value}' for '{key}' on the comment line")]
    InvalidCommentValue { key: &'static str, value: String },
}

/// XYZ files. The comment line may carry `charge=<int>` and
/// `multiplicity=<int>` tokens; both default to a neutral singlet.
pub struct XyzFile;

fn parse_comment(comment: &str, line: usize) -> Result<(i32, u32), XyzError> {
    let mut charge = 0;
    let mut multiplicity = 1;
    for token in comment.split_whitespace() {
        if let Some(value) = token.strip_prefix("charge=") {
            charge = value.parse().map_err(|_| XyzError::Parse {
                line,
                kind: XyzParseErrorKind::InvalidCommentValue {
                    key: "charge",
                    value: value.to_string(),
                },
            })?;
        } else if let Some(value) = token.strip_prefix("multiplicity=") {
            multiplicity = value.parse().map_err(|_| XyzError::Parse {
                line,
                kind: XyzParseErrorKind::InvalidCommentValue {
                    key: "multiplicity",
                    value: value.to_string(),
                },
            })?;
        }
    }
    Ok((charge, multiplicity))
}

fn parse_site(content: &str, line: usize) -> Result<Site, XyzError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 4 {
        return Err(XyzError::Parse {
            line,
            kind: XyzParseErrorKind::MalformedAtomLine(content.to_string()),
        });
    }
    let coordinate = |raw: &str| -> Result<f64, XyzError> {
        raw.parse().map_err(|_| XyzError::Parse {
            line,
            kind: XyzParseErrorKind::InvalidCoordinate(raw.to_string()),
        })
    };
    Ok(Site::new(
        parts[0],
        Point3::new(
            coordinate(parts[1])?,
            coordinate(parts[2])?,
            coordinate(parts[3])?,
        ),
    ))
}

impl StructureFile for XyzFile {
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<Structure, Self::Error> {
        let mut lines = reader.lines();

        let header = lines.next().transpose()?.ok_or(XyzError::Parse {
            line: 1,
            kind: XyzParseErrorKind::MissingHeader,
        })?;
        let expected: usize = header.trim().parse().map_err(|_| XyzError::Parse {
            line: 1,
            kind: XyzParseErrorKind::InvalidCount(header.trim().to_string()),
        })?;

        let comment = lines.next().transpose()?.unwrap_or_default();
        let (charge, multiplicity) = parse_comment(&comment, 2)?;

        let mut sites = Vec::new();
        for (offset, line_res) in lines.enumerate() {
            let content = line_res?;
            if content.trim().is_empty() {
                continue;
            }
            if sites.len() == expected {
                break;
            }
            sites.push(parse_site(&content, offset + 3)?);
        }

        if sites.len() != expected {
            return Err(XyzError::AtomCountMismatch {
                expected,
                found: sites.len(),
            });
        }
        Ok(Structure::new(sites).with_charge_and_multiplicity(charge, multiplicity))
    }

    fn write_to(structure: &Structure, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "{}", structure.len())?;
        writeln!(
            writer,
            "charge={} multiplicity={}",
            structure.charge(),
            structure.spin_multiplicity()
        )?;
        for site in structure.sites() {
            writeln!(
                writer,
                "{:<3}{:>16.8}{:>16.8}{:>16.8}",
                site.species, site.position.x, site.position.y, site.position.z
            )?;
        }
        Ok(())
    }
}
