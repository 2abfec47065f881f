use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn new(vec: Vec<f32>) -> Self {
        Self(vec)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Scales the vector to unit length. A zero vector is returned unchanged.
    pub fn normalized(mut self) -> Self {
        let norm: f32 = self.0.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut self.0 {
                *value /= norm;
            }
        }
        self
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vec: Vec<f32>) -> Self {
        Self(vec)
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_has_unit_length() {
        let embedding = Embedding::new(vec![3.0, 4.0]).normalized();

        assert!((embedding.as_slice()[0] - 0.6).abs() < 1e-6);
        assert!((embedding.as_slice()[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalized_zero_vector_unchanged() {
        let embedding = Embedding::new(vec![0.0; 4]).normalized();
        assert_eq!(embedding.into_inner(), vec![0.0; 4]);
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let json = serde_json::to_string(&Embedding::new(vec![1.0, 0.5])).unwrap();
        assert_eq!(json, "[1.0,0.5]");
    }
}
