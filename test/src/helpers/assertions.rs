/// Assert that a committed Attribute reads as the given JSON value
#[macro_export]
macro_rules! assert_attribute {
    ($world:expr, $scope:expr, $key:expr, $value:expr) => {
        assert_eq!(
            $world.get($scope, $key),
            Some($value),
            "Attribute {} of scope {} does not hold the expected value",
            $key,
            $scope
        );
    };
}

/// Assert that an Attribute has no committed value
#[macro_export]
macro_rules! assert_no_attribute {
    ($world:expr, $scope:expr, $key:expr) => {
        assert_eq!(
            $world.get($scope, $key),
            None,
            "Attribute {} of scope {} should be absent",
            $key,
            $scope
        );
    };
}

/// Assert the exact sequence of calls recorded in a `CallLog`
#[macro_export]
macro_rules! assert_calls {
    ($log:expr, [$($entry:expr),* $(,)?]) => {
        let expected: Vec<String> = vec![$($entry.to_string()),*];
        assert_eq!($log.entries(), expected, "Unexpected listener call sequence");
    };
}
