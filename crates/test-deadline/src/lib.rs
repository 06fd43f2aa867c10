use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, ItemFn, LitInt};

const DEFAULT_DEADLINE_SECS: u64 = 30;

/// Runs a synchronous test on a watchdog thread and fails it if the body
/// does not finish within the deadline (seconds, default 30).
///
/// ```ignore
/// #[test_deadline::deadline]
/// fn finishes_quickly() { ... }
///
/// #[test_deadline::deadline(5)]
/// fn finishes_very_quickly() { ... }
/// ```
#[proc_macro_attribute]
pub fn deadline(attr: TokenStream, item: TokenStream) -> TokenStream {
    let secs = match parse_deadline_secs(attr) {
        Ok(secs) => secs,
        Err(err) => return err.to_compile_error().into(),
    };
    let function = parse_macro_input!(item as ItemFn);

    if function.sig.asyncness.is_some() {
        return syn::Error::new_spanned(
            &function.sig.ident,
            "deadline expects a synchronous test function; use tokio_deadline for async",
        )
        .to_compile_error()
        .into();
    }

    let body = function.block;
    expand(function.attrs, function.vis, function.sig, secs, quote!(#body))
}

/// Async flavor of [`macro@deadline`]: drives the body on a fresh
/// current-thread tokio runtime, bounded both by `tokio::time::timeout`
/// and by the watchdog thread. Replaces `#[tokio::test]`.
#[proc_macro_attribute]
pub fn tokio_deadline(attr: TokenStream, item: TokenStream) -> TokenStream {
    let secs = match parse_deadline_secs(attr) {
        Ok(secs) => secs,
        Err(err) => return err.to_compile_error().into(),
    };
    let function = parse_macro_input!(item as ItemFn);

    if function.sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            &function.sig.ident,
            "tokio_deadline can only be applied to async functions",
        )
        .to_compile_error()
        .into();
    }

    let mut sig = function.sig;
    sig.asyncness = None;
    let body = function.block;
    let driver = quote! {
        {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build tokio runtime for test");
            runtime.block_on(async {
                tokio::time::timeout(__deadline, async move #body)
                    .await
                    .expect("test exceeded its deadline");
            });
        }
    };
    expand(function.attrs, function.vis, sig, secs, driver)
}

fn parse_deadline_secs(attr: TokenStream) -> syn::Result<u64> {
    if attr.is_empty() {
        return Ok(DEFAULT_DEADLINE_SECS);
    }
    let lit: LitInt = syn::parse(attr)?;
    let secs: u64 = lit.base10_parse()?;
    if secs == 0 {
        return Err(syn::Error::new_spanned(lit, "deadline must be non-zero"));
    }
    Ok(secs)
}

fn expand(
    attrs: Vec<Attribute>,
    vis: syn::Visibility,
    sig: syn::Signature,
    secs: u64,
    body: TokenStream2,
) -> TokenStream {
    let kept_attrs: Vec<Attribute> = attrs
        .into_iter()
        .filter(|attr| !is_test_entry_attribute(attr))
        .collect();

    TokenStream::from(quote! {
        #[test]
        #(#kept_attrs)*
        #vis #sig {
            let __deadline = std::time::Duration::from_secs(#secs);
            let (done_tx, done_rx) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| #body));
                let _ = done_tx.send(outcome);
            });
            match done_rx.recv_timeout(__deadline) {
                Ok(Ok(_)) => {}
                Ok(Err(panic)) => std::panic::resume_unwind(panic),
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    panic!("test exceeded its {}s deadline", #secs)
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    panic!("test thread exited without reporting an outcome")
                }
            }
        }
    })
}

/// Strips `#[test]` and `#[tokio::test]` so the expansion owns the entry
/// point even when callers leave the original attribute in place.
fn is_test_entry_attribute(attr: &Attribute) -> bool {
    let segments: Vec<String> = attr
        .path()
        .segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect();
    matches!(
        segments.as_slice(),
        [only] if only == "test"
    ) || matches!(
        segments.as_slice(),
        [first, second] if first == "tokio" && second == "test"
    )
}
