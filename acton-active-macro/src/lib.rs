/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
#![forbid(unsafe_code)]

//! Acton Active Macro Library
//!
//! Procedural macros for Acton Active. They derive the boilerplate that state values
//! and invocation arguments need, and check at compile time that the types can cross
//! task boundaries.
//!
//! # State Macro
//!
//! ```ignore
//! #[active_state]
//! pub struct Account {
//!     balance: i64,
//!     owner: String,
//! }
//! ```
//!
//! # Message Macro
//!
//! ```ignore
//! #[active_message]
//! pub struct Transfer {
//!     pub to: String,
//!     pub amount: u32,
//! }
//! ```
//!
//! # Main Entry Point
//!
//! ```ignore
//! use acton_active::prelude::*;
//!
//! #[active_main]
//! async fn main() {
//!     let runtime = ActiveApp::launch_async().await;
//!     // ... your application logic
//!     runtime.shutdown_all().await.ok();
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;

use quote::{format_ident, quote};
use syn::{parse_macro_input, DeriveInput, ItemFn};

fn has_derive(input: &DeriveInput, trait_name: &str) -> bool {
    input.attrs.iter().any(|attr| {
        if attr.path().is_ident("derive") {
            let mut found = false;
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.segments.last().is_some_and(|s| s.ident == trait_name) {
                    found = true;
                }
                Ok(())
            });
            found
        } else {
            false
        }
    })
}

/// Options accepted by `#[active_state(...)]`.
#[derive(Default)]
struct StateOptions {
    /// Skip deriving Default (user will implement it manually).
    no_default: bool,
}

impl StateOptions {
    fn parse(attr: &TokenStream) -> Self {
        let mut options = Self::default();
        for part in attr.to_string().split(',') {
            if part.trim() == "no_default" {
                options.no_default = true;
            }
        }
        options
    }
}

/// Builds the `#[derive(...)]` attribute for the traits `input` does not derive yet.
///
/// Serde derives are pointed at the copy of serde re-exported by `acton_active`, so
/// users do not need their own serde dependency.
fn derives_for(input: &DeriveInput, wanted: &[&str]) -> TokenStream2 {
    let mut traits = Vec::new();
    let mut uses_serde = false;
    for name in wanted {
        if has_derive(input, name) {
            continue;
        }
        match *name {
            "Serialize" | "Deserialize" => {
                let ident = format_ident!("{}", name);
                traits.push(quote!(::acton_active::prelude::serde::#ident));
                uses_serde = true;
            }
            _ => {
                let ident = format_ident!("{}", name);
                traits.push(quote!(#ident));
            }
        }
    }
    if traits.is_empty() {
        return quote!();
    }
    let serde_crate = if uses_serde {
        quote!(#[serde(crate = "::acton_active::prelude::serde")])
    } else {
        quote!()
    };
    quote! {
        #[derive(#(#traits),*)]
        #serde_crate
    }
}

fn assert_send_sync(input: &DeriveInput, prefix: &str) -> TokenStream2 {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let assert_ident = format_ident!("_{}_{}", prefix, name);
    quote! {
        #[doc(hidden)]
        #[allow(dead_code, non_camel_case_types, non_snake_case, clippy::needless_lifetimes)]
        const _: () = {
            fn #assert_ident #impl_generics () #where_clause {
                fn assert_bounds<T: Send + Sync + 'static>() {}
                assert_bounds::<#name #ty_generics>();
            }
        };
    }
}

/// Derives the traits a value held by a `StateCell` or `PersistentCell` needs.
///
/// # Usage
///
/// ```ignore
/// use acton_active::prelude::*;
///
/// #[active_state]
/// pub struct Ledger {
///     entries: Vec<i64>,
/// }
/// ```
///
/// This expands to:
/// - `#[derive(Default, Clone, Debug, Serialize, Deserialize)]` (only traits not already present)
/// - A compile-time assertion that the type is `Send + Sync + 'static`
///
/// Persistent cells snapshot the value as JSON on every commit, which is why the serde
/// derives are included.
///
/// # Options
///
/// ## `no_default`
///
/// Skip deriving `Default` when it has to be written by hand:
///
/// ```ignore
/// #[active_state(no_default)]
/// struct Limits {
///     max: u32,
/// }
///
/// impl Default for Limits {
///     fn default() -> Self {
///         Self { max: 10 }
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn active_state(attr: TokenStream, item: TokenStream) -> TokenStream {
    let options = StateOptions::parse(&attr);
    let input = parse_macro_input!(item as DeriveInput);

    let wanted: &[&str] = if options.no_default {
        &["Clone", "Debug", "Serialize", "Deserialize"]
    } else {
        &["Default", "Clone", "Debug", "Serialize", "Deserialize"]
    };
    let derives = derives_for(&input, wanted);
    let assertion = assert_send_sync(&input, "AssertActiveState");

    TokenStream::from(quote! {
        #derives
        #input
        #assertion
    })
}

/// Derives the traits a method argument or result type needs to travel inside an
/// invocation, locally or across a remote connection.
///
/// # Usage
///
/// ```ignore
/// use acton_active::prelude::*;
///
/// #[active_message]
/// pub struct Withdraw {
///     pub amount: u32,
/// }
/// ```
///
/// This expands to:
/// - `#[derive(Clone, Debug, Serialize, Deserialize)]` (only traits not already present)
/// - A compile-time assertion that the type is `Send + Sync + 'static`
#[proc_macro_attribute]
pub fn active_message(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let derives = derives_for(&input, &["Clone", "Debug", "Serialize", "Deserialize"]);
    let assertion = assert_send_sync(&input, "AssertActiveMessage");

    TokenStream::from(quote! {
        #derives
        #input
        #assertion
    })
}

/// Entry point macro for Acton Active applications.
///
/// Marks an async `main` and builds the Tokio runtime it runs on.
///
/// # Configuration
///
/// - `flavor`: `"multi_thread"` (default) or `"current_thread"`
/// - `worker_threads`: Number of worker threads (only for multi-threaded runtime)
///
/// ```ignore
/// #[active_main(flavor = "current_thread")]
/// async fn main() { }
///
/// #[active_main(worker_threads = 4)]
/// async fn main() { }
/// ```
#[proc_macro_attribute]
pub fn active_main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let body = &input.block;

    if sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            sig.fn_token,
            "the async keyword is missing from the function declaration",
        )
        .to_compile_error()
        .into();
    }

    if sig.ident != "main" {
        return syn::Error::new_spanned(
            &sig.ident,
            "active_main can only be applied to the main function",
        )
        .to_compile_error()
        .into();
    }

    let attr_string = attr.to_string();
    let use_current_thread = attr_string.contains("current_thread");
    let worker_threads: Option<usize> = attr_string
        .split(',')
        .find(|s| s.contains("worker_threads"))
        .and_then(|s| s.split('=').nth(1).and_then(|v| v.trim().parse().ok()));

    let runtime_builder = if use_current_thread {
        quote! {
            ::acton_active::prelude::tokio::runtime::Builder::new_current_thread()
        }
    } else if let Some(threads) = worker_threads {
        quote! {
            ::acton_active::prelude::tokio::runtime::Builder::new_multi_thread()
                .worker_threads(#threads)
        }
    } else {
        quote! {
            ::acton_active::prelude::tokio::runtime::Builder::new_multi_thread()
        }
    };

    let fn_name = &sig.ident;
    let fn_inputs = &sig.inputs;
    let fn_output = &sig.output;

    TokenStream::from(quote! {
        #(#attrs)*
        #vis fn #fn_name(#fn_inputs) #fn_output {
            #runtime_builder
                .enable_all()
                .build()
                .expect("Failed to build Acton Active runtime")
                .block_on(async #body)
        }
    })
}
