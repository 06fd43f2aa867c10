use crate::sdp::Envelope;

/// Capability behind the synchronous exchange mode: turns the remote side's
/// envelope into the locally produced reply.
///
/// Registered once per id and invoked at most once; the registry removes the
/// entry on first use. Implemented for plain closures so embedding code can
/// pass a `Fn` without a wrapper type.
pub trait Resolver: Send + Sync {
    fn resolve(&self, remote: Envelope) -> Envelope;
}

impl<F> Resolver for F
where
    F: Fn(Envelope) -> Envelope + Send + Sync,
{
    fn resolve(&self, remote: Envelope) -> Envelope {
        (self)(remote)
    }
}
