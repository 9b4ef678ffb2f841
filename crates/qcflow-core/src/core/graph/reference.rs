use super::error::{GraphError, ResolutionError};
use crate::core::models::ids::JobId;
use crate::core::models::stage::OutputSchema;
use crate::core::models::value::Value;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// A path into a job's output, made of field names and list indices.
///
/// The empty path addresses the whole output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn joined(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// Walks this path through `value`, the published output of `job`.
    pub fn project<'v>(&self, job: JobId, value: &'v Value) -> Result<&'v Value, ResolutionError> {
        let mut current = value;
        for (depth, segment) in self.0.iter().enumerate() {
            let walked = || FieldPath(self.0[..=depth].to_vec());
            current = match segment {
                PathSegment::Field(name) => current
                    .as_map()
                    .and_then(|fields| fields.get(name))
                    .ok_or_else(|| ResolutionError::MissingField {
                        job,
                        path: walked(),
                    })?,
                PathSegment::Index(index) => {
                    let items = current.as_list().ok_or_else(|| ResolutionError::TypeMismatch {
                        expected: "list",
                        found: current.kind(),
                        context: format!("'{}' of job {}", walked(), job),
                    })?;
                    items
                        .get(*index)
                        .ok_or_else(|| ResolutionError::IndexOutOfBounds {
                            job,
                            path: walked(),
                            index: *index,
                            len: items.len(),
                        })?
                }
            };
        }
        Ok(current)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<output>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => write!(f, "{name}")?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// A handle to (part of) the output of a job that may not have run yet.
///
/// References are plain values: cloning one never touches the job, and any
/// number of downstream consumers may hold references into the same output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputReference {
    job: JobId,
    job_name: String,
    path: FieldPath,
    #[serde(skip)]
    schema: Option<OutputSchema>,
}

impl OutputReference {
    pub(crate) fn root(job: JobId, job_name: &str, schema: OutputSchema) -> Self {
        Self {
            job,
            job_name: job_name.to_string(),
            path: FieldPath::default(),
            schema: Some(schema),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job
    }

    /// Name of the job at the time the reference was taken.
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Whether this reference addresses the job's whole output.
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Projects a named field.
    ///
    /// On a job's whole output the field must be part of the stage's declared
    /// schema; deeper fields are checked when the output is resolved.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UndeclaredField`] if the job does not declare
    /// `name`.
    pub fn field(&self, name: &str) -> Result<OutputReference, GraphError> {
        if let (true, Some(schema)) = (self.is_root(), self.schema) {
            if !schema.declares(name) {
                return Err(GraphError::UndeclaredField {
                    job: self.job_name.clone(),
                    field: name.to_string(),
                });
            }
        }
        Ok(Self {
            job: self.job,
            job_name: self.job_name.clone(),
            path: self.path.joined(PathSegment::Field(name.to_string())),
            schema: None,
        })
    }

    /// Projects a list element.
    pub fn index(&self, index: usize) -> OutputReference {
        Self {
            job: self.job,
            job_name: self.job_name.clone(),
            path: self.path.joined(PathSegment::Index(index)),
            schema: None,
        }
    }
}

impl PartialEq for OutputReference {
    fn eq(&self, other: &Self) -> bool {
        self.job == other.job && self.path == other.path
    }
}

impl fmt::Display for OutputReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.job_name, self.path)
    }
}

/// Source of published job outputs.
pub trait ReferenceResolver {
    /// Returns the whole published output of `job`.
    fn output_of(&self, job: JobId) -> Result<&Value, ResolutionError>;

    fn resolve(&self, reference: &OutputReference) -> Result<&Value, ResolutionError> {
        let output = self.output_of(reference.job_id())?;
        reference.path().project(reference.job_id(), output)
    }
}
