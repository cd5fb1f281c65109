use crate::types::{SourceStatus, TicketRecord};
use std::fmt;

/// What the reconciler does for one source issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Create,
    TransitionToClosed,
    TransitionToOpen,
    NoOp,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Create => "create",
            Decision::TransitionToClosed => "close",
            Decision::TransitionToOpen => "reopen",
            Decision::NoOp => "none",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare a source issue's status with the ticket indexed for it.
///
/// `closed_status` is the tracker status name that counts as closed; any
/// other status counts as open.
pub fn decide(
    status: SourceStatus,
    ticket: Option<&TicketRecord>,
    closed_status: &str,
) -> Decision {
    let Some(ticket) = ticket else {
        return Decision::Create;
    };
    let ticket_closed = ticket.status == closed_status;
    match (status, ticket_closed) {
        (SourceStatus::Closed, false) => Decision::TransitionToClosed,
        (SourceStatus::Open, true) => Decision::TransitionToOpen,
        (SourceStatus::Closed, true) | (SourceStatus::Open, false) => Decision::NoOp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(status: &str) -> TicketRecord {
        TicketRecord::new("OSASINFRA-1", status)
    }

    #[test]
    fn missing_ticket_is_created_whatever_the_status() {
        assert_eq!(decide(SourceStatus::Open, None, "Closed"), Decision::Create);
        assert_eq!(decide(SourceStatus::Closed, None, "Closed"), Decision::Create);
    }

    #[test]
    fn closed_issue_closes_open_ticket() {
        let t = ticket("In Progress");
        assert_eq!(
            decide(SourceStatus::Closed, Some(&t), "Closed"),
            Decision::TransitionToClosed
        );
    }

    #[test]
    fn open_issue_reopens_closed_ticket() {
        let t = ticket("Closed");
        assert_eq!(
            decide(SourceStatus::Open, Some(&t), "Closed"),
            Decision::TransitionToOpen
        );
    }

    #[test]
    fn matching_states_are_left_alone() {
        assert_eq!(
            decide(SourceStatus::Closed, Some(&ticket("Closed")), "Closed"),
            Decision::NoOp
        );
        assert_eq!(
            decide(SourceStatus::Open, Some(&ticket("To Do")), "Closed"),
            Decision::NoOp
        );
    }

    #[test]
    fn status_comparison_is_exact() {
        // "closed" in lower case is not the tracker's closed status
        assert_eq!(
            decide(SourceStatus::Closed, Some(&ticket("closed")), "Closed"),
            Decision::TransitionToClosed
        );
    }

    /// Apply each decision to an in-memory tracker and rerun until stable.
    #[test]
    fn repeated_runs_converge_to_no_changes() {
        use std::collections::BTreeMap;

        let issues = [
            (1, SourceStatus::Open),
            (2, SourceStatus::Closed),
            (3, SourceStatus::Open),
            (4, SourceStatus::Closed),
        ];
        let mut tracker: BTreeMap<u64, TicketRecord> = BTreeMap::new();
        tracker.insert(3, ticket("Closed"));
        tracker.insert(4, ticket("In Progress"));

        let run = |tracker: &mut BTreeMap<u64, TicketRecord>| -> Vec<Decision> {
            let mut decisions = Vec::new();
            for (number, status) in issues {
                let d = decide(status, tracker.get(&number), "Closed");
                match d {
                    // new tickets always start open
                    Decision::Create => {
                        tracker.insert(number, ticket("To Do"));
                    }
                    Decision::TransitionToClosed => {
                        tracker.insert(number, ticket("Closed"));
                    }
                    Decision::TransitionToOpen => {
                        tracker.insert(number, ticket("To Do"));
                    }
                    Decision::NoOp => {}
                }
                decisions.push(d);
            }
            decisions
        };

        use Decision::*;
        assert_eq!(
            run(&mut tracker),
            vec![Create, Create, TransitionToOpen, TransitionToClosed]
        );
        // the closed issue created open is closed on the next pass
        assert_eq!(run(&mut tracker), vec![NoOp, TransitionToClosed, NoOp, NoOp]);
        assert_eq!(run(&mut tracker), vec![NoOp; 4]);
    }
}
