use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, parse_quote, spanned::Spanned, Ident, ItemFn, LitStr};

const USAGE: &str = "rxcore_macro::test only accepts: #[rxcore_macro::test], \
                     #[rxcore_macro::test(local)], #[rxcore_macro::test(shared)], or \
                     string equivalents";

/// Marks a test function.
///
/// Sync functions become plain `#[test]`s. Async functions run on tokio: a
/// current-thread runtime by default or with `local`, a multi-thread runtime
/// with `shared`. Every test installs a `tracing` subscriber that writes
/// through the test harness, filtered by `RUST_LOG`.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let mut input = parse_macro_input!(item as ItemFn);
  let is_async = input.sig.asyncness.is_some();

  let raw_args = proc_macro2::TokenStream::from(attr);
  let tokio_args = if raw_args.is_empty() {
    proc_macro2::TokenStream::new()
  } else {
    if !is_async {
      return syn::Error::new(
        raw_args.span(),
        "rxcore_macro::test flavor args are only supported for async tests",
      )
      .to_compile_error()
      .into();
    }
    let flavor = if let Ok(ident) = syn::parse2::<Ident>(raw_args.clone()) {
      (ident.to_string(), ident.span())
    } else if let Ok(lit) = syn::parse2::<LitStr>(raw_args.clone()) {
      (lit.value(), lit.span())
    } else {
      return syn::Error::new(raw_args.span(), USAGE).to_compile_error().into();
    };
    match flavor.0.as_str() {
      "local" => quote!(flavor = "current_thread"),
      "shared" => quote!(flavor = "multi_thread"),
      _ => return syn::Error::new(flavor.1, USAGE).to_compile_error().into(),
    }
  };

  input.block.stmts.insert(
    0,
    parse_quote! {
      let _ = ::tracing_subscriber::fmt()
        .with_env_filter(::tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    },
  );

  let attr = if is_async { quote!(tokio::test(#tokio_args)) } else { quote!(test) };

  TokenStream::from(quote! {
    #[#attr]
    #input
  })
}
