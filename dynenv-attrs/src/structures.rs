use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{quote, quote_spanned, ToTokens};
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    Expr,
    Fields,
    Ident,
    ItemStruct,
    Result,
    Token,
};

/// A tag of the `error` attribute. Each tag generates the [`ErrorKind`] method of the same name.
///
/// [`ErrorKind`]: https://docs.rs/dynenv-error/latest/dynenv_error/trait.ErrorKind.html
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Message,
    Help,
    Note,
}

impl Tag {
    fn from_ident(ident: &Ident) -> Result<Self> {
        match ident.to_string().as_str() {
            "message" => Ok(Tag::Message),
            "help" => Ok(Tag::Help),
            "note" => Ok(Tag::Note),
            other => Err(syn::Error::new_spanned(ident, format!("unknown tag `{}`", other))),
        }
    }

    fn method(self) -> Ident {
        let name = match self {
            Tag::Message => "message",
            Tag::Help => "help",
            Tag::Note => "note",
        };
        Ident::new(name, Span::call_site())
    }

    /// The return type of the generated method. Only the message is mandatory.
    fn output(self) -> TokenStream2 {
        match self {
            Tag::Message => quote! { String },
            Tag::Help | Tag::Note => quote! { Option<String> },
        }
    }
}

/// A single `tag = expr` entry.
struct TagArg {
    ident: Ident,
    tag: Tag,
    expr: Expr,
}

impl Parse for TagArg {
    fn parse(input: ParseStream) -> Result<Self> {
        let ident: Ident = input.parse()?;
        let tag = Tag::from_ident(&ident)?;
        input.parse::<Token![=]>()?;
        Ok(TagArg { ident, tag, expr: input.parse()? })
    }
}

/// The contents of the `error` attribute: each tag at most once, `message` required.
#[derive(Default)]
struct ErrorArgs {
    tags: Vec<(Tag, Expr)>,
}

impl ErrorArgs {
    /// Finds and parses the `error` attribute of the given struct.
    fn parse_for(item: &ItemStruct) -> Result<Self> {
        let Some(attr) = item.attrs.iter().find(|attr| attr.path().is_ident("error")) else {
            return Err(syn::Error::new_spanned(&item.ident, "missing `error` attribute"));
        };
        let args = attr.parse_args::<ErrorArgs>()?;

        if !args.tags.iter().any(|(tag, _)| *tag == Tag::Message) {
            return Err(syn::Error::new_spanned(attr, "missing `message` tag in `error` attribute"));
        }
        Ok(args)
    }
}

impl Parse for ErrorArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut args = ErrorArgs::default();
        for arg in Punctuated::<TagArg, Token![,]>::parse_terminated(input)? {
            if args.tags.iter().any(|(tag, _)| *tag == arg.tag) {
                return Err(syn::Error::new_spanned(&arg.ident, format!("duplicate tag `{}`", arg.ident)));
            }
            args.tags.push((arg.tag, arg.expr));
        }
        Ok(args)
    }
}

/// The struct to derive [`ErrorKind`] for.
///
/// [`ErrorKind`]: https://docs.rs/dynenv-error/latest/dynenv_error/trait.ErrorKind.html
pub struct ErrorKindTarget {
    pub name: Ident,
    fields: Fields,
    args: ErrorArgs,
}

impl ErrorKindTarget {
    /// Brings the named fields into scope, so tag expressions can use them directly.
    fn bind_fields(&self) -> TokenStream2 {
        let name = &self.name;
        match &self.fields {
            Fields::Named(fields) => {
                let idents = fields.named.iter().filter_map(|field| field.ident.as_ref());
                quote! { let #name { #(#idents),* } = self; }
            },
            Fields::Unnamed(_) => quote_spanned! {
                name.span() => compile_error!("`ErrorKind` cannot be derived for tuple structs");
            },
            Fields::Unit => TokenStream2::new(),
        }
    }
}

impl Parse for ErrorKindTarget {
    fn parse(input: ParseStream) -> Result<Self> {
        let item = input.parse::<ItemStruct>()?;
        let args = ErrorArgs::parse_for(&item)?;
        Ok(ErrorKindTarget { name: item.ident, fields: item.fields, args })
    }
}

impl ToTokens for ErrorKindTarget {
    fn to_tokens(&self, tokens: &mut TokenStream2) {
        let bindings = self.bind_fields();
        for (tag, expr) in &self.args.tags {
            let (method, output) = (tag.method(), tag.output());
            tokens.extend(quote! {
                #[allow(unused_variables)]
                fn #method(&self) -> #output {
                    #bindings
                    (#expr).to_owned().into()
                }
            });
        }
    }
}
