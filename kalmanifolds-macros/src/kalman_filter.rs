use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{ToTokens, quote};
use syn::{
    Error, Expr, Generics, Ident, Result, Token, Type,
    parse::{Parse, ParseStream},
    parse_quote,
};

use crate::utils::EnumNewtypes;

/// `#[kalman_filter(group = G, dof = N)]`
struct FilterArgs {
    group: Type,
    dof: Expr,
}

impl Parse for FilterArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut group = None;
        let mut dof = None;
        while !input.is_empty() {
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            match key.to_string().as_str() {
                "group" => group = Some(input.parse()?),
                "dof" => dof = Some(input.parse()?),
                _ => return Err(Error::new(key.span(), "expect `group` or `dof`")),
            }
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(Self {
            group: group.ok_or_else(|| input.error("missing `group = ...`"))?,
            dof: dof.ok_or_else(|| input.error("missing `dof = ...`"))?,
        })
    }
}

pub struct Input {
    ident: Ident,
    generics: Generics,
    variants: Vec<(Ident, Type)>,
    args: FilterArgs,
}

impl Parse for Input {
    fn parse(input: ParseStream) -> Result<Self> {
        let EnumNewtypes {
            attrs,
            ident,
            mut generics,
            variants,
            ..
        } = input.parse()?;

        let args: FilterArgs = attrs
            .iter()
            .find(|attr| attr.path().is_ident("kalman_filter"))
            .ok_or_else(|| {
                Error::new(
                    Span::call_site(),
                    "expect #[kalman_filter(group = ..., dof = ...)]",
                )
            })?
            .parse_args()?;

        let FilterArgs { group, dof } = &args;
        let predicates = &mut generics.make_where_clause().predicates;
        variants.iter().for_each(|(_, ty)| {
            predicates.push(parse_quote! {
                #ty: ::kalmanifolds::filter::KalmanFilter<#group, { #dof }>
            });
        });

        Ok(Self {
            ident,
            generics,
            variants,
            args,
        })
    }
}

impl ToTokens for Input {
    fn to_tokens(&self, tokens: &mut TokenStream2) {
        let Self {
            ident,
            generics,
            variants,
            args: FilterArgs { group, dof },
        } = self;
        let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

        let filter_trait = quote! { ::kalmanifolds::filter::KalmanFilter<#group, { #dof }> };
        let element = quote! { <#group as ::kalmanifolds::lie::LieGroup<{ #dof }>>::Element };

        let dispatch = |call: TokenStream2| {
            let arms = variants.iter().map(|(variant, ty)| {
                quote! { Self::#variant(filter) => <#ty as #filter_trait>::#call }
            });
            quote! {
                match self {
                    #(#arms,)*
                }
            }
        };
        let propagate = dispatch(quote! { propagate(filter, model, control) });
        let update = dispatch(quote! { update(filter, model, measurement) });
        let state = dispatch(quote! { state(filter) });
        let covariance = dispatch(quote! { covariance(filter) });

        tokens.extend(quote! {
            impl #impl_generics #filter_trait for #ident #ty_generics
            #where_clause
            {
                fn propagate<__Motion>(
                    &mut self,
                    model: &__Motion,
                    control: &::kalmanifolds::lie::Tangent<#element, { #dof }>,
                ) -> ::core::result::Result<(), ::kalmanifolds::error::NumericalError>
                where
                    __Motion: ::kalmanifolds::model::MotionModel<#group, { #dof }>,
                {
                    #propagate
                }

                fn update<__Measurement, const __M: usize>(
                    &mut self,
                    model: &__Measurement,
                    measurement: &::kalmanifolds::nalgebra::SVector<#element, __M>,
                ) -> ::core::result::Result<(), ::kalmanifolds::error::NumericalError>
                where
                    __Measurement: ::kalmanifolds::model::MeasurementModel<#group, { #dof }, __M>,
                {
                    #update
                }

                fn state(&self) -> &#group {
                    #state
                }

                fn covariance(&self) -> ::kalmanifolds::covariance::Covariance<#element, { #dof }> {
                    #covariance
                }
            }
        });
    }
}
