//! Booking step state machine with validated transitions.
//!
//! For a form of `n` fields:
//! Collecting(0) -> ... -> Collecting(n-1) -> Confirm -> Done/Cancelled

use crate::error::ChatError;
use crate::types::BookingStep;

/// Validate that a step transition is allowed for a form of `field_count` fields.
///
/// Valid transitions:
/// - Collecting(i) -> Collecting(i + 1), while i + 1 < field_count
/// - Collecting(field_count - 1) -> Confirm
/// - Confirm -> Done
/// - Confirm -> Cancelled (declined, or the booking backend failed)
pub fn validate_transition(
    field_count: usize,
    from: BookingStep,
    to: BookingStep,
) -> Result<(), ChatError> {
    let valid = match (from, to) {
        (BookingStep::Collecting { field: a }, BookingStep::Collecting { field: b }) => {
            b == a + 1 && b < field_count
        }
        (BookingStep::Collecting { field }, BookingStep::Confirm) => field + 1 == field_count,
        (BookingStep::Confirm, BookingStep::Done) => true,
        (BookingStep::Confirm, BookingStep::Cancelled) => true,
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ChatError::InvalidTransition(from, to))
    }
}

/// The step that follows a collecting step.
pub fn next_after_collecting(field_count: usize, field: usize) -> BookingStep {
    if field + 1 < field_count {
        BookingStep::Collecting { field: field + 1 }
    } else {
        BookingStep::Confirm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: usize = 3;

    fn collecting(field: usize) -> BookingStep {
        BookingStep::Collecting { field }
    }

    // =====================================================================
    // Valid transitions
    // =====================================================================

    #[test]
    fn test_name_to_doctor() {
        assert!(validate_transition(N, collecting(0), collecting(1)).is_ok());
    }

    #[test]
    fn test_doctor_to_time() {
        assert!(validate_transition(N, collecting(1), collecting(2)).is_ok());
    }

    #[test]
    fn test_time_to_confirm() {
        assert!(validate_transition(N, collecting(2), BookingStep::Confirm).is_ok());
    }

    #[test]
    fn test_confirm_to_terminal() {
        assert!(validate_transition(N, BookingStep::Confirm, BookingStep::Done).is_ok());
        assert!(validate_transition(N, BookingStep::Confirm, BookingStep::Cancelled).is_ok());
    }

    #[test]
    fn test_single_field_form_goes_straight_to_confirm() {
        assert!(validate_transition(1, collecting(0), BookingStep::Confirm).is_ok());
        assert!(validate_transition(1, collecting(0), collecting(1)).is_err());
    }

    // =====================================================================
    // Invalid transitions
    // =====================================================================

    #[test]
    fn test_cannot_skip_fields() {
        assert!(validate_transition(N, collecting(0), collecting(2)).is_err());
        assert!(validate_transition(N, collecting(0), BookingStep::Confirm).is_err());
    }

    #[test]
    fn test_cannot_go_backwards() {
        assert!(validate_transition(N, collecting(2), collecting(1)).is_err());
        assert!(validate_transition(N, BookingStep::Confirm, collecting(2)).is_err());
    }

    #[test]
    fn test_collecting_past_form_end() {
        assert!(validate_transition(N, collecting(2), collecting(3)).is_err());
    }

    #[test]
    fn test_collecting_cannot_finish_directly() {
        assert!(validate_transition(N, collecting(2), BookingStep::Done).is_err());
        assert!(validate_transition(N, collecting(0), BookingStep::Cancelled).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in [BookingStep::Done, BookingStep::Cancelled] {
            for to in [
                collecting(0),
                BookingStep::Confirm,
                BookingStep::Done,
                BookingStep::Cancelled,
            ] {
                assert!(
                    validate_transition(N, from, to).is_err(),
                    "{} -> {} should be rejected",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_error_names_both_steps() {
        let err = validate_transition(N, BookingStep::Done, BookingStep::Confirm).unwrap_err();
        assert!(matches!(
            err,
            ChatError::InvalidTransition(BookingStep::Done, BookingStep::Confirm)
        ));
    }

    #[test]
    fn test_next_after_collecting() {
        assert_eq!(next_after_collecting(N, 0), collecting(1));
        assert_eq!(next_after_collecting(N, 1), collecting(2));
        assert_eq!(next_after_collecting(N, 2), BookingStep::Confirm);
    }
}
