pub(crate) mod kalman_filter;
pub(crate) mod utils;
use proc_macro::TokenStream;
use quote::ToTokens;

/// Derive macro for `KalmanFilter` on an enum whose variants each wrap one filter.
///
/// # Example
///
/// ```ignore
/// #[derive(KalmanFilter)]
/// #[kalman_filter(group = G, dof = N)]
/// enum Filter<G: LieGroup<N>, const N: usize> {
///     Ekf(Ekf<G, N>),
///     Ukfm(Ukfm<G, N>),
/// }
/// ```
#[proc_macro_derive(KalmanFilter, attributes(kalman_filter))]
pub fn derive_kalman_filter(ts: TokenStream) -> TokenStream {
    syn::parse_macro_input!(ts as kalman_filter::Input)
        .to_token_stream()
        .into()
}
