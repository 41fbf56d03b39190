extern crate proc_macro2;
use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Ident, LitBool, LitInt, LitStr};

/// Implements `sensorpulse::Telemetry` for a reading type.
///
/// ```ignore
/// #[derive(Telemetry)]
/// #[telemetry(topic = "home/kitchen/current", qos = 0, retain = false)]
/// struct KitchenCurrent(f64);
/// ```
///
/// `topic` is required, `qos` defaults to 0 and `retain` to `false`.
#[proc_macro_derive(Telemetry, attributes(telemetry))]
pub fn telemetry_macro(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

struct TelemetryArgs {
    topic: LitStr,
    qos: Ident,
    retain: bool,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let TelemetryArgs { topic, qos, retain } = parse_args(input)?;

    Ok(quote! {
        impl #impl_generics ::sensorpulse::Telemetry for #struct_name #ty_generics #where_clause {
            const TOPIC: &'static str = #topic;
            const QOS: ::sensorpulse::QoS = ::sensorpulse::QoS::#qos;
            const RETAIN: bool = #retain;
        }
    })
}

fn parse_args(input: &DeriveInput) -> syn::Result<TelemetryArgs> {
    let mut topic: Option<LitStr> = None;
    let mut qos = Ident::new("AtMostOnce", Span::call_site());
    let mut retain = false;

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("telemetry")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("topic") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(syn::Error::new(value.span(), "topic must not be empty"));
                }
                topic = Some(value);
                Ok(())
            } else if meta.path.is_ident("qos") {
                let value: LitInt = meta.value()?.parse()?;
                let variant = match value.base10_parse::<u8>()? {
                    0 => "AtMostOnce",
                    1 => "AtLeastOnce",
                    2 => "ExactlyOnce",
                    _ => {
                        return Err(syn::Error::new(
                            value.span(),
                            "qos must be 0, 1 or 2",
                        ))
                    }
                };
                qos = Ident::new(variant, value.span());
                Ok(())
            } else if meta.path.is_ident("retain") {
                let value: LitBool = meta.value()?.parse()?;
                retain = value.value;
                Ok(())
            } else {
                Err(meta.error("expected `topic`, `qos` or `retain`"))
            }
        })?;
    }

    let topic = topic.ok_or_else(|| {
        syn::Error::new_spanned(
            &input.ident,
            "missing #[telemetry(topic = \"...\")] attribute",
        )
    })?;

    Ok(TelemetryArgs { topic, qos, retain })
}
