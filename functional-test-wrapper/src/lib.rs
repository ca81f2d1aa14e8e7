// Polkadot app acceptance tests and supporting software libraries
//
// Copyright (C) 2024 The polkadot-app-harness developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use proc_macro::TokenStream;

use quote::quote;

use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Ident, ItemFn, LitStr, Token};

#[derive(Debug, Clone, Default)]
struct Attributes {
    seed: Option<String>,
    timeout_secs: Option<String>,
}

struct SingleAttr {
    name: Ident,
    _equal: Token![=],
    value: LitStr,
}

impl Parse for SingleAttr {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(SingleAttr {
            name: input.parse()?,
            _equal: input.parse()?,
            value: input.parse()?,
        })
    }
}

impl Parse for Attributes {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut attrs = Attributes::default();
        let parsed = Punctuated::<SingleAttr, Token![,]>::parse_terminated(input).unwrap();
        for attr in &parsed {
            match attr.name.to_string().as_str() {
                "seed" => attrs.seed = Some(attr.value.value()),
                "timeout_secs" => attrs.timeout_secs = Some(attr.value.value()),
                x => panic!("Invalid attr {}", x),
            }
        }

        Ok(attrs)
    }
}

/// Wrap a scenario test: single-worker runtime, one-time logger init, a
/// scenario context provisioned with the configured seed, a wall-clock
/// budget, and an HTML report when the body fails.
#[proc_macro_attribute]
pub fn functional_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = parse_macro_input!(attr as Attributes);

    let mut input = parse_macro_input!(item as ItemFn);
    let original_ident = input.sig.ident.clone();
    let new_ident = Ident::new(&format!("{}_inner", original_ident), original_ident.span());
    input.sig.ident = new_ident.clone();

    let original_ident_str = original_ident.to_string();

    let seed = match attrs.seed {
        None => quote! { crate::tests::TEST_SEED },
        Some(value) => quote! { #value },
    };
    let timeout = match attrs.timeout_secs {
        None => quote! { 60u64 },
        Some(value) => quote! {{
            let secs = #value.parse::<u64>().expect("Valid u64 number");
            secs
        }},
    };

    let expanded = quote! {
        #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
        async fn #original_ident() -> Result<(), crate::Error> {
            #input

            crate::tests::INIT_LOG.call_once(|| {
                env_logger::init();
            });

            let snapshot_root = crate::tests::snapshot_root(#original_ident_str);
            let mut context = crate::scenario::ScenarioContext::simulated(#seed, snapshot_root);

            let budget = std::time::Duration::from_secs(#timeout);
            let result = match tokio::time::timeout(budget, #new_ident(&mut context)).await {
                Ok(result) => result,
                Err(_) => Err(crate::Error::from("Scenario wall-clock budget exceeded")),
            };

            if let Err(e) = result {
                let to = crate::tests::report_dir().join(concat!(#original_ident_str, ".html"));
                context.render_report(&to)?;
                assert!(
                    false,
                    "Test '{}' failed: {}. Report available here: {}",
                    #original_ident_str,
                    e,
                    to.display()
                );
            }

            Ok(())
        }
    };

    TokenStream::from(expanded)
}
