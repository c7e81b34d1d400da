use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one running on a
/// multi-threaded runtime, and inject dependencies.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// `crate::model::store::MemoryStore`, `crate::engine::Engine`, and
/// `crate::config::Config`. All of them share one fresh in-memory store, seeded
/// with the example config's SCC codes.
///
/// `#[backend_test(ec)]` logs the client in as the Election Commission and
/// `#[backend_test(voter)]` registers example voter 0 and logs in as them.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Log in the client as EC/voter if needed.
    let maybe_login = match parse_macro_input!(args as Option<Ident>) {
        None => quote! {},
        Some(arg) if arg == "ec" => quote! {
            let (email, password) = config.ec_credentials().unwrap();
            let response = rocket_client
                .post("/api/login")
                .header(rocket::http::ContentType::JSON)
                .body(rocket::serde::json::json!({"email": email, "password": password}).to_string())
                .dispatch()
                .await;
            assert_eq!(response.status(), rocket::http::Status::Ok, "EC login failed");
        },
        Some(arg) if arg == "voter" => quote! {
            store
                .insert_voter(crate::model::db::NewVoter::example(0))
                .await;
            let response = rocket_client
                .post("/api/login")
                .header(rocket::http::ContentType::JSON)
                .body(
                    rocket::serde::json::json!({
                        "email": crate::model::db::NewVoter::example_email(0),
                        "password": crate::model::db::voter::examples::EXAMPLE_PASSWORD,
                    })
                    .to_string(),
                )
                .dispatch()
                .await;
            assert_eq!(response.status(), rocket::http::Status::Ok, "Voter login failed");
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `ec` or `voter`")
                .into_compile_error()
                .into();
        }
    };

    quote! {
        #[test]
        fn #name() {
            #item_fn

            async fn setup() -> (
                rocket::local::asynchronous::Client,
                crate::model::store::MemoryStore,
                crate::engine::Engine,
                crate::config::Config,
            ) {
                use crate::model::store::Store as _;

                let config = crate::config::Config::example();
                let store = crate::model::store::MemoryStore::new();
                store.ensure_sccs_exist(config.scc_codes()).await.unwrap();
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_store(store.clone(), config.clone()),
                )
                .await
                .unwrap();
                let engine = rocket_client
                    .rocket()
                    .state::<crate::engine::Engine>()
                    .unwrap()
                    .clone();

                {
                    #maybe_login
                }

                (rocket_client, store, engine, config)
            }

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(4)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                #[allow(unused_variables)]
                let (rocket_client, store, engine, config) = setup().await;
                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject
/// unknown or repeated parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    const INJECTABLE: [(&str, &str); 4] = [
        ("Client", "rocket_client"),
        ("MemoryStore", "store"),
        ("Engine", "engine"),
        ("Config", "config"),
    ];

    let mut seen = vec![];
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                if let Some(type_ident) = type_path.path.segments.last().map(|s| &s.ident) {
                    if let Some((ty, local)) =
                        INJECTABLE.iter().find(|(ty, _)| type_ident == ty)
                    {
                        if seen.contains(ty) {
                            return Err(syn::Error::new(
                                input.span(),
                                format!("Test cannot accept more than one `{ty}`"),
                            ));
                        }
                        seen.push(*ty);
                        let local = format_ident!("{}", local);
                        args.push(quote! { #local });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `Client`, `MemoryStore`, `Engine` or `Config`",
        ));
    }

    Ok(args)
}
