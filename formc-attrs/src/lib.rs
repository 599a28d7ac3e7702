mod error_kind;

use error_kind::ErrorKindTarget;
use proc_macro::TokenStream;
use quote::quote;
use syn::parse_macro_input;

/// Derives the `ErrorKind` trait of `formc-error` for the given struct.
///
/// This trait can be derived for any struct with named fields or no fields.
///
/// The information of the error can be customized using the `error` attribute by adding the
/// corresponding tags to it:
/// ```
/// use formc_attrs::ErrorKind;
///
/// #[derive(Debug, ErrorKind)]
/// #[error(message = "expected a scalar operand", labels = ["this operand"])]
/// pub struct Foo;
/// ```
///
/// The following tags are available:
///
/// | Tag         | Description                                                                  |
/// | ----------- | ---------------------------------------------------------------------------- |
/// | `message`   | The message displayed at the top of the error when it is displayed.          |
/// | `labels`    | An array of label texts; the `n`th label points to the `n`th span.           |
/// | `help`      | Optional help text for the error, describing what the user can do to fix it. |
/// | `note`      | Optional note with additional context.                                       |
///
/// Each tag accepts an expression that should evaluate to something implementing
/// [`ToString`]. For structs with named fields, the expression is evaluated with the members of
/// the struct in scope, so they can be used in the expression (tuple structs are not supported).
///
/// The generated code refers to the `ariadne` and `formc_error` crates by name, so both must be
/// dependencies of the crate using the derive.
#[proc_macro_derive(ErrorKind, attributes(error))]
pub fn error_kind(item: TokenStream) -> TokenStream {
    let target = parse_macro_input!(item as ErrorKindTarget);
    let name = &target.name;
    quote! {
        impl formc_error::ErrorKind for #name {
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
            #target
        }
    }.into()
}
