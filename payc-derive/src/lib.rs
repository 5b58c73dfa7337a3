use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, Lit, LitStr, Meta, Type,
};

/// Describe the CSV columns of a flat input record.
///
/// Each named field becomes one column. The column name follows
/// `#[serde(rename = "...")]`, a column is optional when the field is an
/// `Option<T>` or carries `#[serde(default)]` (on the field or the struct),
/// and the field's doc comment is the column description.
///
/// Generates `csv_schema() -> &'static [CsvField]` and
/// `csv_header() -> &'static [&'static str]`. `CsvField` must be in scope.
#[proc_macro_derive(CsvSchema, attributes(serde))]
pub fn derive_csv_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct Column {
    name: String,
    required: bool,
    description: String,
}

#[derive(Default)]
struct SerdeAttrs {
    rename: Option<String>,
    default: bool,
    skip: bool,
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "CsvSchema requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "CsvSchema can only be derived for structs",
            ))
        }
    };

    let container = serde_attrs(&input.attrs)?;

    let mut columns = Vec::with_capacity(fields.len());
    for field in fields {
        let attrs = serde_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        columns.push(Column {
            name: attrs.rename.unwrap_or_else(|| ident.to_string()),
            required: !(container.default || attrs.default || is_option(&field.ty)),
            description: doc_comment(&field.attrs),
        });
    }

    let entries = columns.iter().map(|column| {
        let Column {
            name,
            required,
            description,
        } = column;
        quote! {
            CsvField {
                name: #name,
                required: #required,
                description: #description,
            }
        }
    });
    let names = columns.iter().map(|column| &column.name);

    Ok(quote! {
        impl #name {
            pub fn csv_schema() -> &'static [CsvField] {
                static SCHEMA: &[CsvField] = &[#(#entries),*];
                SCHEMA
            }

            pub fn csv_header() -> &'static [&'static str] {
                static HEADER: &[&str] = &[#(#names),*];
                HEADER
            }
        }
    })
}

fn serde_attrs(attrs: &[Attribute]) -> syn::Result<SerdeAttrs> {
    let mut out = SerdeAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                out.rename = Some(value.value());
            } else if meta.path.is_ident("default") {
                out.default = true;
                if meta.input.peek(syn::Token![=]) {
                    let _: Expr = meta.value()?.parse()?;
                }
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_deserializing") {
                out.skip = true;
            } else if meta.input.peek(syn::Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                let _content;
                syn::parenthesized!(_content in meta.input);
            }
            Ok(())
        })?;
    }
    Ok(out)
}

fn doc_comment(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(meta) => match &meta.value {
                Expr::Lit(expr) => match &expr.lit {
                    Lit::Str(s) => Some(s.value().trim().to_string()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}
