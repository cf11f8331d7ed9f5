/// Execute an aggregate command in place (decide, then apply).
///
/// Handy in tests and for in-process flows that do not need persistence. The
/// full pipeline with append + publish lives in the infra command dispatcher.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: glowdesk_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
