use crate::Keys;

/// Compares algorithm output against a trusted reference ordering
pub struct CorrectnessValidator;

impl CorrectnessValidator {
    /// Element-wise, order-sensitive equality of the value sequences
    pub fn validate(candidate: &Keys, reference: &Keys) -> bool {
        Self::first_mismatch(candidate, reference).is_none()
    }

    /// Position of the first differing element, or the shorter length when
    /// one sequence is a prefix of the other
    pub fn first_mismatch(candidate: &Keys, reference: &Keys) -> Option<usize> {
        match (candidate, reference) {
            (Keys::Int(c), Keys::Int(r)) => mismatch_in(c, r),
            (Keys::Float(c), Keys::Float(r)) => mismatch_in(c, r),
            // Output of the wrong key type can never match
            _ => Some(0),
        }
    }
}

fn mismatch_in<T: PartialEq>(candidate: &[T], reference: &[T]) -> Option<usize> {
    candidate
        .iter()
        .zip(reference)
        .position(|(c, r)| c != r)
        .or_else(|| (candidate.len() != reference.len()).then(|| candidate.len().min(reference.len())))
}
