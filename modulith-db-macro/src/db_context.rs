use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::spanned::Spanned;
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields, LitStr, Type};

pub fn derive_db_context(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_db_context_impl(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn generate_db_context_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new(
                    input.span(),
                    "#[derive(DbContext)] only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "#[derive(DbContext)] can only be applied to structs",
            ))
        }
    };

    let database_field = find_database_field(fields.iter().collect(), input)?;
    let database_name = &database_field.ident;

    // Every other field starts from its Default
    let other_fields = fields
        .iter()
        .filter(|field| field.ident != database_field.ident)
        .map(|field| {
            let name = &field.ident;
            quote! { #name: ::core::default::Default::default() }
        });

    let type_name = LitStr::new(&struct_name.to_string(), struct_name.span());

    Ok(quote! {
        impl #impl_generics ::modulith_db::persistence::DbContext for #struct_name #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;

            fn from_database(database: ::modulith_db::persistence::DatabaseFacade) -> Self {
                Self {
                    #database_name: database,
                    #(#other_fields),*
                }
            }

            fn database(&self) -> &::modulith_db::persistence::DatabaseFacade {
                &self.#database_name
            }

            fn database_mut(&mut self) -> &mut ::modulith_db::persistence::DatabaseFacade {
                &mut self.#database_name
            }
        }
    })
}

/// The field marked `#[database]`, else the only field typed `DatabaseFacade`
fn find_database_field<'a>(fields: Vec<&'a Field>, input: &DeriveInput) -> syn::Result<&'a Field> {
    let marked: Vec<&Field> = fields
        .iter()
        .copied()
        .filter(|field| field.attrs.iter().any(|attr| attr.path().is_ident("database")))
        .collect();
    let candidates = if marked.is_empty() {
        fields
            .into_iter()
            .filter(|field| is_database_facade(&field.ty))
            .collect()
    } else {
        marked
    };

    match candidates.as_slice() {
        [field] => Ok(field),
        [] => Err(syn::Error::new(
            input.span(),
            "#[derive(DbContext)] needs a `DatabaseFacade` field",
        )),
        [_, second, ..] => Err(syn::Error::new(
            second.span(),
            "#[derive(DbContext)] found more than one database field; mark one with #[database]",
        )),
    }
}

fn is_database_facade(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "DatabaseFacade"),
        _ => false,
    }
}
