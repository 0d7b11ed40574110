use syn::{
    Attribute, Data, DeriveInput, Fields, Generics, Ident, Result, Type, Visibility,
    parse::{Parse, ParseStream},
};

/// An enum whose variants all hold exactly one unnamed field.
#[expect(dead_code)]
pub struct EnumNewtypes {
    pub attrs: Vec<Attribute>,
    pub vis: Visibility,
    pub ident: Ident,
    pub generics: Generics,
    pub variants: Vec<(Ident, Type)>,
}

impl Parse for EnumNewtypes {
    fn parse(input: ParseStream) -> Result<Self> {
        let DeriveInput {
            attrs,
            vis,
            ident,
            generics,
            data,
        } = input.parse()?;

        let Data::Enum(data) = data else {
            return Err(input.error("Expected an enum"));
        };

        let variants = data
            .variants
            .into_iter()
            .map(|variant| {
                let Fields::Unnamed(fields) = variant.fields else {
                    return Err(syn::Error::new_spanned(
                        variant.ident,
                        "Expected a tuple variant",
                    ));
                };
                let mut fields = fields.unnamed.into_iter();
                match (fields.next(), fields.next()) {
                    (Some(field), None) => Ok((variant.ident, field.ty)),
                    _ => Err(syn::Error::new_spanned(
                        variant.ident,
                        "Expected exactly one field",
                    )),
                }
            })
            .collect::<Result<_>>()?;

        Ok(EnumNewtypes {
            attrs,
            vis,
            ident,
            generics,
            variants,
        })
    }
}
