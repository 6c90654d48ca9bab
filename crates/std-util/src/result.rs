/// Unwraps an `Err`, panicking with the `Ok` value otherwise.
///
/// Extra format arguments are appended to the panic message.
#[macro_export]
macro_rules! assert_err {
    ($e:expr $(, $($t:tt)* )?) => {
        match $e {
            Err(e) => e,
            Ok(value) => {
                #[allow(unused_mut)]
                let mut msg = format!("expected `Err`; actual=Ok({:?})", value);

                $(
                    msg.push_str(", ");
                    msg.push_str(&format!($($t)*));
                )?

                panic!("{}", msg);
            }
        }
    };
}

/// Unwraps an `Ok`, panicking with the displayed error otherwise.
#[macro_export]
macro_rules! assert_ok {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(err) => panic!("expected `Ok`; actual=Err({})", err),
        }
    };
}

/// Asserts the expression fails and that the rendered error contains every
/// given fragment. Evaluates to the error.
#[macro_export]
macro_rules! assert_err_contains {
    ($e:expr, $($fragment:expr),+ $(,)?) => {{
        let err = $crate::assert_err!($e);
        let rendered = err.to_string();

        $(
            assert!(
                rendered.contains($fragment),
                "error message did not contain `{}`; message=`{}`",
                $fragment,
                rendered,
            );
        )+

        err
    }};
}
