use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Shape, SpecError};

/// Logical type of a deployed model's input or output feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Image,
    Numeric,
    Categorical,
    Text,
    Binary,
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureType::Image => "image",
            FeatureType::Numeric => "numeric",
            FeatureType::Categorical => "categorical",
            FeatureType::Text => "text",
            FeatureType::Binary => "binary",
        };
        f.write_str(name)
    }
}

/// Serde mirror of [`FeatureSpec`]; validated on the way in.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct RawFeatureSpec {
    name: String,
    dtype: FeatureType,
    shape: Shape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vocabulary: Option<Vec<String>>,
}

/// Declared type and shape contract of one named feature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFeatureSpec", into = "RawFeatureSpec")]
pub struct FeatureSpec {
    name: String,
    dtype: FeatureType,
    shape: Shape,
    vocabulary: Option<Vec<String>>,
}

impl FeatureSpec {
    pub fn new(
        name: impl Into<String>,
        dtype: FeatureType,
        shape: impl Into<Shape>,
    ) -> Result<Self, SpecError> {
        let spec = Self {
            name: name.into(),
            dtype,
            shape: shape.into(),
            vocabulary: None,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Restricts a categorical feature to the given labels.
    pub fn with_vocabulary<I, S>(mut self, categories: I) -> Result<Self, SpecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vocabulary = Some(categories.into_iter().map(Into::into).collect());
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), SpecError> {
        if self.name.is_empty() {
            return Err(SpecError::EmptyName);
        }
        if self.shape.rank() == 0 {
            return Err(SpecError::EmptyShape {
                feature: self.name.clone(),
            });
        }
        if self.shape.dims().contains(&0) {
            return Err(SpecError::ZeroDimension {
                feature: self.name.clone(),
                shape: self.shape.clone(),
            });
        }
        if self.dtype == FeatureType::Image {
            let ok = match self.shape.dims() {
                [_, _] => true,
                [_, _, c] => *c == 1 || *c == 3,
                _ => false,
            };
            if !ok {
                return Err(SpecError::InvalidImageShape {
                    feature: self.name.clone(),
                    shape: self.shape.clone(),
                });
            }
        }
        if let Some(vocabulary) = &self.vocabulary {
            if self.dtype != FeatureType::Categorical {
                return Err(SpecError::VocabularyNotAllowed {
                    feature: self.name.clone(),
                    dtype: self.dtype,
                });
            }
            let mut seen = HashSet::new();
            for category in vocabulary {
                if !seen.insert(category.as_str()) {
                    return Err(SpecError::DuplicateCategory {
                        feature: self.name.clone(),
                        category: category.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> FeatureType {
        self.dtype
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn vocabulary(&self) -> Option<&[String]> {
        self.vocabulary.as_deref()
    }

    /// Numeric features with a single element travel as plain numbers.
    pub fn is_scalar(&self) -> bool {
        self.dtype == FeatureType::Numeric && self.shape.dims() == [1]
    }
}

impl TryFrom<RawFeatureSpec> for FeatureSpec {
    type Error = SpecError;

    fn try_from(raw: RawFeatureSpec) -> Result<Self, Self::Error> {
        let spec = Self {
            name: raw.name,
            dtype: raw.dtype,
            shape: raw.shape,
            vocabulary: raw.vocabulary,
        };
        spec.validate()?;
        Ok(spec)
    }
}

impl From<FeatureSpec> for RawFeatureSpec {
    fn from(spec: FeatureSpec) -> Self {
        Self {
            name: spec.name,
            dtype: spec.dtype,
            shape: spec.shape,
            vocabulary: spec.vocabulary,
        }
    }
}

impl fmt::Display for FeatureSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FeatureSpec(name=\"{}\", dtype=\"{}\", shape={})",
            self.name, self.dtype, self.shape
        )
    }
}

/// Ordered set of feature specs with unique names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FeatureSpec>", into = "Vec<FeatureSpec>")]
pub struct FeatureSpecSet {
    specs: Vec<FeatureSpec>,
}

impl FeatureSpecSet {
    pub fn new(specs: Vec<FeatureSpec>) -> Result<Self, SpecError> {
        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name()) {
                return Err(SpecError::DuplicateFeature {
                    feature: spec.name().to_string(),
                });
            }
        }
        Ok(Self { specs })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeatureSpec> {
        self.specs.iter()
    }

    pub fn get(&self, name: &str) -> Option<&FeatureSpec> {
        self.specs.iter().find(|s| s.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(FeatureSpec::name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl TryFrom<Vec<FeatureSpec>> for FeatureSpecSet {
    type Error = SpecError;

    fn try_from(specs: Vec<FeatureSpec>) -> Result<Self, Self::Error> {
        Self::new(specs)
    }
}

impl From<FeatureSpecSet> for Vec<FeatureSpec> {
    fn from(set: FeatureSpecSet) -> Self {
        set.specs
    }
}

impl<'a> IntoIterator for &'a FeatureSpecSet {
    type Item = &'a FeatureSpec;
    type IntoIter = std::slice::Iter<'a, FeatureSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}
